//! Dual-EMA crossover strategy.
//!
//! On the tick where the fast EMA crosses up through the slow EMA, sweeps the
//! ask levels from the lowest price up until buy room runs out. The mirrored
//! sell sweep on a downward cross is opt-in.

use tickreplay_core::config::EmaCrossoverConfig;
use tickreplay_core::{Result, Side};
use tickreplay_features::Cross;

use super::{Strategy, StrategyContext};

/// Fast/slow EMA crossover.
#[derive(Debug, Clone)]
pub struct EmaCrossover {
    sell_on_cross_down: bool,
}

impl EmaCrossover {
    /// Create from configuration.
    pub fn new(config: &EmaCrossoverConfig) -> Self {
        Self {
            sell_on_cross_down: config.sell_on_cross_down,
        }
    }

    fn sweep(&self, ctx: &mut StrategyContext<'_>, side: Side) -> Result<()> {
        let market = ctx.market();
        for level in market.levels(side) {
            let room = match side {
                Side::Ask => ctx.room_to_buy(),
                Side::Bid => ctx.room_to_sell(),
            };
            if room == 0 {
                break;
            }
            let quantity = room.min(level.size());
            match side {
                Side::Ask => ctx.buy(level.price, quantity)?,
                Side::Bid => ctx.sell(level.price, quantity)?,
            }
        }
        Ok(())
    }
}

impl Strategy for EmaCrossover {
    fn name(&self) -> &'static str {
        "ema_crossover"
    }

    fn on_tick(&self, ctx: &mut StrategyContext<'_>) -> Result<()> {
        match ctx.history().ema_cross() {
            Some(Cross::Up) => {
                ctx.log("ema cross up");
                self.sweep(ctx, Side::Ask)
            }
            Some(Cross::Down) if self.sell_on_cross_down => {
                ctx.log("ema cross down");
                self.sweep(ctx, Side::Bid)
            }
            _ => Ok(()),
        }
    }
}
