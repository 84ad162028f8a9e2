//! Replay a price file through the configured strategies and print the
//! settlement.
//!
//! Usage:
//!   tickreplay --data prices_round_1_day_0.csv
//!   tickreplay --data prices.csv --config replay.json --telemetry out.jsonl

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tickreplay_backtest::{ReplayEngine, ReplayOutcome};
use tickreplay_core::Config;
use tickreplay_ingestion::{read_price_file, FrameBuilder};

/// Order book snapshot replay
#[derive(Parser, Debug)]
#[command(name = "tickreplay")]
#[command(about = "Replay order book snapshots through trading strategies and settle the result")]
struct Cli {
    /// Delimited price file with three book levels per side
    #[arg(short, long)]
    data: PathBuf,

    /// JSON configuration (defaults apply when omitted)
    #[arg(short, long, env = "TICKREPLAY_CONFIG")]
    config: Option<PathBuf>,

    /// Write one telemetry record per tick to this file
    #[arg(short, long)]
    telemetry: Option<PathBuf>,

    /// Field delimiter, overriding the configuration
    #[arg(long)]
    delimiter: Option<char>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(delimiter) = cli.delimiter {
        config.ingestion.delimiter = delimiter;
    }
    if cli.telemetry.is_some() {
        config.telemetry.enabled = true;
    }
    config.validate().context("invalid configuration")?;

    let delimiter = u8::try_from(config.ingestion.delimiter)
        .context("delimiter must be a single ASCII character")?;
    let rows = read_price_file(&cli.data, delimiter)
        .with_context(|| format!("reading {}", cli.data.display()))?;

    let mut builder = FrameBuilder::new();
    builder.add_rows(&rows);
    tracing::info!(
        rows = rows.len(),
        frames = builder.frame_count(),
        replaced = builder.replaced_rows(),
        "loaded price file"
    );

    let outcome = ReplayEngine::new(&config).run(builder.finish())?;

    if let Some(path) = &cli.telemetry {
        write_telemetry(path, &outcome.telemetry)
            .with_context(|| format!("writing telemetry {}", path.display()))?;
    }

    print_summary(&outcome);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn write_telemetry(path: &Path, lines: &[String]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

fn print_summary(outcome: &ReplayOutcome) {
    println!("ticks:         {}", outcome.ticks);
    println!("aborted ticks: {}", outcome.aborted_ticks);
    println!("orders:        {}", outcome.ledger.len());
    println!();
    println!(
        "{:<16} {:>12} {:>10} {:>12} {:>14}",
        "symbol", "cash", "inventory", "mark", "pnl"
    );
    for (symbol, settled) in &outcome.settlement.symbols {
        let mark = settled
            .mark_price
            .map_or_else(|| "-".to_string(), |price| format!("{price:.1}"));
        println!(
            "{:<16} {:>12} {:>10} {:>12} {:>14.2}",
            symbol,
            settled.cash,
            settled.inventory,
            mark,
            settled.pnl()
        );
    }
    println!();
    println!("cash: {}", outcome.settlement.cash);
    println!("pnl:  {:.2}", outcome.settlement.pnl);
}
