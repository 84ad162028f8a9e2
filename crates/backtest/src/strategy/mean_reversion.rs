//! Mean-reversion band strategy.
//!
//! Compares the max-volume mid against a band of `k` population standard
//! deviations around the mean level-1 mid of the last `window` ticks. Below the
//! band it lifts the best ask; above it, it hits the best bid.

use statrs::statistics::Statistics;

use tickreplay_core::config::{BandWidth, MeanReversionConfig};
use tickreplay_core::Result;

use super::{Strategy, StrategyContext};

/// Mean-reversion band.
#[derive(Debug, Clone)]
pub struct MeanReversionBand {
    window: usize,
    band: BandWidth,
}

impl MeanReversionBand {
    /// Create from configuration.
    pub fn new(config: &MeanReversionConfig) -> Self {
        Self {
            window: config.window,
            band: config.band,
        }
    }
}

impl Strategy for MeanReversionBand {
    fn name(&self) -> &'static str {
        "mean_reversion"
    }

    fn on_tick(&self, ctx: &mut StrategyContext<'_>) -> Result<()> {
        let market = ctx.market();

        let mids = ctx.history().rolling_mid(self.window);
        if mids.len() < self.window {
            return Ok(());
        }
        // A window with a missing side has no defined mean.
        let Some(mids) = mids.into_iter().collect::<Option<Vec<f64>>>() else {
            return Ok(());
        };

        let k = match self.band {
            BandWidth::Fixed { k } => k,
            BandWidth::BookRange => match (market.worst_ask(), market.best_bid()) {
                (Some(worst_ask), Some(best_bid)) => (worst_ask - best_bid) as f64,
                _ => return Ok(()),
            },
        };

        let mean = mids.iter().mean();
        let std_dev = mids.iter().population_std_dev();
        let lower = mean - k * std_dev;
        let upper = mean + k * std_dev;
        let reference = market.max_volume_mid();

        if reference < lower {
            if let Some(ask) = market.best_ask() {
                let quantity = ctx.room_to_buy().min(market.best_ask_amount());
                ctx.log(format!("{reference} below band {lower:.2}: buy {quantity} @ {ask}"));
                ctx.buy(ask, quantity)?;
            }
        } else if reference > upper {
            if let Some(bid) = market.best_bid() {
                let quantity = ctx.room_to_sell().min(market.best_bid_amount());
                ctx.log(format!("{reference} above band {upper:.2}: sell {quantity} @ {bid}"));
                ctx.sell(bid, quantity)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionTracker;
    use std::collections::BTreeMap;
    use tickreplay_core::config::{HistoryConfig, PositionLimits};
    use tickreplay_core::BookSnapshot;
    use tickreplay_features::{HistoryBuffer, MarketState};

    fn limits(limit: i64) -> PositionLimits {
        let mut map = BTreeMap::new();
        map.insert("X".to_string(), limit);
        PositionLimits(map)
    }

    fn strategy(window: usize) -> MeanReversionBand {
        MeanReversionBand::new(&MeanReversionConfig {
            window,
            band: BandWidth::Fixed { k: 1.0 },
        })
    }

    /// Record `books` and run the strategy on the last one.
    fn run(
        strategy: &MeanReversionBand,
        books: &[BookSnapshot],
        positions: &mut PositionTracker,
    ) -> Vec<tickreplay_core::Order> {
        run_on(strategy, books, books.last().unwrap(), positions)
    }

    /// Record `books` and run the strategy against `current`.
    fn run_on(
        strategy: &MeanReversionBand,
        books: &[BookSnapshot],
        current: &BookSnapshot,
        positions: &mut PositionTracker,
    ) -> Vec<tickreplay_core::Order> {
        let mut history = HistoryBuffer::new(&HistoryConfig::default());
        for book in books {
            history.record_tick("X", book);
        }
        let market = MarketState::new("X", current);
        let mut ctx = StrategyContext::new(0, market, history.get("X").unwrap(), positions);
        strategy.on_tick(&mut ctx).unwrap();
        ctx.into_parts().0
    }

    fn quote(bid: i64, ask: i64, size: i64) -> BookSnapshot {
        BookSnapshot::from_levels([(bid, size)], [(ask, size)])
    }

    #[test]
    fn test_waits_for_full_window() {
        let mut positions = PositionTracker::new(limits(10));
        let books = vec![quote(100, 102, 5), quote(80, 82, 5)];
        assert!(run(&strategy(3), &books, &mut positions).is_empty());
    }

    #[test]
    fn test_buys_below_band() {
        let mut positions = PositionTracker::new(limits(10));
        let books = vec![
            quote(100, 102, 5),
            quote(100, 102, 5),
            quote(100, 102, 5),
            quote(90, 92, 4),
        ];

        let orders = run(&strategy(4), &books, &mut positions);

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].price, 92);
        assert_eq!(orders[0].quantity, 4); // min(room 10, ask size 4)
        assert_eq!(positions.optimistic("X"), 4);
    }

    #[test]
    fn test_sells_above_band_limited_by_room() {
        let mut positions = PositionTracker::new(limits(3));
        let books = vec![
            quote(100, 102, 5),
            quote(100, 102, 5),
            quote(100, 102, 5),
            quote(110, 112, 8),
        ];

        let orders = run(&strategy(4), &books, &mut positions);

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].price, 110);
        assert_eq!(orders[0].quantity, -3);
        assert_eq!(positions.optimistic("X"), -3);
    }

    #[test]
    fn test_absent_mid_in_window_skips() {
        let mut positions = PositionTracker::new(limits(10));
        let books = vec![
            quote(100, 102, 5),
            BookSnapshot::from_levels([(100, 5)], []),
            quote(90, 92, 4),
        ];
        assert!(run(&strategy(3), &books, &mut positions).is_empty());
    }

    fn book_range(window: usize) -> MeanReversionBand {
        MeanReversionBand::new(&MeanReversionConfig {
            window,
            band: BandWidth::BookRange,
        })
    }

    #[test]
    fn test_book_range_band_is_wider_than_fixed() {
        // mids 101, 101, 101, 99: mean 100.5, population sigma sqrt(0.75)
        let books = vec![
            quote(100, 102, 5),
            quote(100, 102, 5),
            quote(100, 102, 5),
            quote(98, 100, 4),
        ];

        // k = 1: lower band 99.63, reference 99 is below it.
        let mut positions = PositionTracker::new(limits(10));
        let orders = run(&strategy(4), &books, &mut positions);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].price, 100);
        assert_eq!(orders[0].quantity, 4);

        // k = worst_ask - best_bid = 2: lower band 98.77, reference is inside.
        let mut positions = PositionTracker::new(limits(10));
        assert!(run(&book_range(4), &books, &mut positions).is_empty());
        assert_eq!(positions.optimistic("X"), 0);
    }

    #[test]
    fn test_book_range_with_empty_current_book_skips() {
        let books = vec![quote(100, 102, 5), quote(100, 102, 5), quote(90, 92, 5)];
        let mut positions = PositionTracker::new(limits(10));

        let orders = run_on(&book_range(3), &books, &BookSnapshot::empty(), &mut positions);

        assert!(orders.is_empty());
    }

    #[test]
    fn test_book_range_with_one_sided_current_book_skips() {
        let mut books = vec![quote(100, 102, 5); 3];
        books.push(BookSnapshot::from_levels([(90, 5)], []));
        let mut positions = PositionTracker::new(limits(10));

        assert!(run(&book_range(4), &books, &mut positions).is_empty());
    }

    #[test]
    fn test_flat_window_inside_band() {
        let mut positions = PositionTracker::new(limits(10));
        let books = vec![quote(100, 102, 5); 5];
        assert!(run(&strategy(5), &books, &mut positions).is_empty());
    }
}
