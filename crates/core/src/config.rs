//! Configuration structures for the tick replay system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Quantity, Symbol};

/// Main configuration for a replay run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Absolute position limit per symbol.
    pub limits: PositionLimits,
    /// History buffer configuration.
    pub history: HistoryConfig,
    /// Strategy routing and parameters.
    pub strategies: StrategyConfig,
    /// Telemetry output configuration.
    pub telemetry: TelemetryConfig,
    /// Input file configuration.
    pub ingestion: IngestionConfig,
}

impl Config {
    /// Load and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        for (symbol, limit) in &self.limits.0 {
            if *limit < 0 {
                return Err(Error::config(format!("negative position limit for {symbol}")));
            }
        }

        if self.history.fast_ema_window == 0 || self.history.slow_ema_window == 0 {
            return Err(Error::config("EMA windows must be positive"));
        }

        if self.strategies.mean_reversion.window == 0 {
            return Err(Error::config("mean reversion window must be positive"));
        }

        if let BandWidth::Fixed { k } = self.strategies.mean_reversion.band {
            if k.is_nan() || k <= 0.0 {
                return Err(Error::config("mean reversion band k must be positive"));
            }
        }

        if !self.ingestion.delimiter.is_ascii() {
            return Err(Error::config("delimiter must be a single ASCII character"));
        }

        for symbol in self.strategies.routes.keys() {
            if !self.limits.0.contains_key(symbol) {
                return Err(Error::config(format!("route for {symbol} has no position limit")));
            }
        }

        Ok(())
    }
}

/// Absolute position limit per symbol. Unlisted symbols have limit 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionLimits(pub BTreeMap<Symbol, Quantity>);

impl PositionLimits {
    /// Limit for a symbol.
    pub fn get(&self, symbol: &str) -> Quantity {
        self.0.get(symbol).copied().unwrap_or(0)
    }
}

impl Default for PositionLimits {
    fn default() -> Self {
        let limits = [
            ("RAINFOREST_RESIN", 50),
            ("KELP", 50),
            ("SQUID_INK", 50),
            ("CROISSANTS", 250),
            ("JAMS", 350),
            ("DJEMBES", 60),
            ("PICNIC_BASKET1", 60),
            ("PICNIC_BASKET2", 100),
        ];
        Self(limits.into_iter().map(|(s, l)| (s.to_string(), l)).collect())
    }
}

/// History buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Fast EMA window in ticks.
    pub fast_ema_window: u32,
    /// Slow EMA window in ticks.
    pub slow_ema_window: u32,
}

impl HistoryConfig {
    /// Smoothing factor `2 / (window + 1)` of the fast EMA.
    pub fn fast_alpha(&self) -> f64 {
        2.0 / (self.fast_ema_window as f64 + 1.0)
    }

    /// Smoothing factor `2 / (window + 1)` of the slow EMA.
    pub fn slow_alpha(&self) -> f64 {
        2.0 / (self.slow_ema_window as f64 + 1.0)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            fast_ema_window: 35,
            slow_ema_window: 100,
        }
    }
}

/// Strategy variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Mean-reversion band around the rolling mid.
    MeanReversion,
    /// Fast/slow EMA crossover.
    EmaCrossover,
}

/// Strategy routing and parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Strategies run for each symbol, in order.
    pub routes: BTreeMap<Symbol, Vec<StrategyKind>>,
    /// Mean-reversion parameters.
    pub mean_reversion: MeanReversionConfig,
    /// EMA crossover parameters.
    pub ema_crossover: EmaCrossoverConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let mut routes = BTreeMap::new();
        routes.insert("SQUID_INK".to_string(), vec![StrategyKind::EmaCrossover]);
        Self {
            routes,
            mean_reversion: MeanReversionConfig::default(),
            ema_crossover: EmaCrossoverConfig::default(),
        }
    }
}

/// Band half-width multiplier for mean reversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BandWidth {
    /// Fixed number of standard deviations.
    Fixed { k: f64 },
    /// `worst_ask - best_bid` of the current tick.
    BookRange,
}

/// Mean-reversion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeanReversionConfig {
    /// Mid-price window length in ticks.
    pub window: usize,
    /// Band multiplier.
    pub band: BandWidth,
}

impl Default for MeanReversionConfig {
    fn default() -> Self {
        Self {
            window: 20,
            band: BandWidth::Fixed { k: 2.0 },
        }
    }
}

/// EMA crossover configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaCrossoverConfig {
    /// Also sweep bids on a downward cross.
    pub sell_on_cross_down: bool,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Emit one JSON record per tick.
    pub enabled: bool,
    /// Byte budget of one record.
    pub max_log_length: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_log_length: 3750,
        }
    }
}

/// Input file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Field delimiter of the price file.
    pub delimiter: char,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self { delimiter: ';' }
    }
}
