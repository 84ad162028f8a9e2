//! Strategy contract and the built-in strategy variants.
//!
//! A strategy reads one symbol's market view, history and positions through a
//! [`StrategyContext`] and emits orders through it. Several strategies can run
//! for the same symbol on one tick; each sees the positions left by the last.

pub mod context;
pub mod ema_crossover;
pub mod mean_reversion;

pub use context::StrategyContext;
pub use ema_crossover::EmaCrossover;
pub use mean_reversion::MeanReversionBand;

use std::fmt;

use tickreplay_core::config::{StrategyConfig, StrategyKind};
use tickreplay_core::Result;

/// Decision logic for one symbol per invocation.
pub trait Strategy: fmt::Debug {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Emit this tick's orders through `ctx`.
    fn on_tick(&self, ctx: &mut StrategyContext<'_>) -> Result<()>;
}

/// The closed set of built-in strategies.
#[derive(Debug, Clone)]
pub enum AnyStrategy {
    MeanReversion(MeanReversionBand),
    EmaCrossover(EmaCrossover),
}

impl AnyStrategy {
    /// Build a configured strategy of the given kind.
    pub fn from_kind(kind: StrategyKind, config: &StrategyConfig) -> Self {
        match kind {
            StrategyKind::MeanReversion => {
                AnyStrategy::MeanReversion(MeanReversionBand::new(&config.mean_reversion))
            }
            StrategyKind::EmaCrossover => {
                AnyStrategy::EmaCrossover(EmaCrossover::new(&config.ema_crossover))
            }
        }
    }
}

impl Strategy for AnyStrategy {
    fn name(&self) -> &'static str {
        match self {
            AnyStrategy::MeanReversion(s) => s.name(),
            AnyStrategy::EmaCrossover(s) => s.name(),
        }
    }

    fn on_tick(&self, ctx: &mut StrategyContext<'_>) -> Result<()> {
        match self {
            AnyStrategy::MeanReversion(s) => s.on_tick(ctx),
            AnyStrategy::EmaCrossover(s) => s.on_tick(ctx),
        }
    }
}
