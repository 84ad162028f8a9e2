//! Derived quantities over one symbol's book at the current tick.
//!
//! A one-sided book synthesizes the missing side one tick away from the
//! present side's best price. Only a fully empty book has no best/mid/spread.

use tickreplay_core::{BookSnapshot, Price, PriceLevel, Quantity, Side};

/// Volume-weighted price of a set of levels, `None` at zero total volume.
pub fn volume_weighted_price<'l, I>(levels: I) -> Option<f64>
where
    I: IntoIterator<Item = &'l PriceLevel>,
{
    let (notional, volume) = levels.into_iter().fold((0i64, 0i64), |(n, v), level| {
        (n + level.price * level.size(), v + level.size())
    });

    if volume > 0 {
        Some(notional as f64 / volume as f64)
    } else {
        None
    }
}

/// Read-only market view for one symbol.
#[derive(Debug, Clone, Copy)]
pub struct MarketState<'a> {
    symbol: &'a str,
    book: &'a BookSnapshot,
}

impl<'a> MarketState<'a> {
    /// Create a view over a symbol's current book.
    pub fn new(symbol: &'a str, book: &'a BookSnapshot) -> Self {
        Self { symbol, book }
    }

    /// Symbol of this view.
    pub fn symbol(&self) -> &'a str {
        self.symbol
    }

    /// Underlying snapshot.
    pub fn book(&self) -> &'a BookSnapshot {
        self.book
    }

    /// Present levels of one side, best first.
    pub fn levels(&self, side: Side) -> impl Iterator<Item = &'a PriceLevel> + 'a {
        self.book.levels(side)
    }

    fn innermost(&self, side: Side) -> Option<Price> {
        self.book.slots(side)[0].map(|level| level.price)
    }

    fn outermost(&self, side: Side) -> Option<Price> {
        self.book.levels(side).last().map(|level| level.price)
    }

    /// Highest bid, or `best_ask - 1` when there are no bids.
    pub fn best_bid(&self) -> Option<Price> {
        self.innermost(Side::Bid)
            .or_else(|| self.innermost(Side::Ask).map(|ask| ask - 1))
    }

    /// Lowest ask, or `best_bid + 1` when there are no asks.
    pub fn best_ask(&self) -> Option<Price> {
        self.innermost(Side::Ask)
            .or_else(|| self.innermost(Side::Bid).map(|bid| bid + 1))
    }

    /// Lowest retained bid, or `best_ask - 1` when there are no bids.
    pub fn worst_bid(&self) -> Option<Price> {
        self.outermost(Side::Bid)
            .or_else(|| self.best_ask().map(|ask| ask - 1))
    }

    /// Highest retained ask, or `best_bid + 1` when there are no asks.
    pub fn worst_ask(&self) -> Option<Price> {
        self.outermost(Side::Ask)
            .or_else(|| self.best_bid().map(|bid| bid + 1))
    }

    /// Mid price.
    pub fn mid(&self) -> Option<f64> {
        Some((self.best_bid()? + self.best_ask()?) as f64 / 2.0)
    }

    /// Spread.
    pub fn spread(&self) -> Option<Price> {
        Some(self.best_ask()? - self.best_bid()?)
    }

    /// Size resting at the best bid (0 when there are no bids).
    pub fn best_bid_amount(&self) -> Quantity {
        self.book.slots(Side::Bid)[0].map_or(0, |level| level.size())
    }

    /// Size resting at the best ask (0 when there are no asks).
    pub fn best_ask_amount(&self) -> Quantity {
        self.book.slots(Side::Ask)[0].map_or(0, |level| level.size())
    }

    /// Volume-weighted price across all retained levels on both sides.
    pub fn vwap(&self) -> Option<f64> {
        volume_weighted_price(self.levels(Side::Bid).chain(self.levels(Side::Ask)))
    }

    /// Volume-weighted price of the bid side.
    pub fn level_vwap_bid(&self) -> Option<f64> {
        volume_weighted_price(self.levels(Side::Bid))
    }

    /// Volume-weighted price of the ask side.
    pub fn level_vwap_ask(&self) -> Option<f64> {
        volume_weighted_price(self.levels(Side::Ask))
    }

    /// Price with the largest resting size on one side.
    ///
    /// Ties keep the level seen first (best first). Returns 0 when the side is
    /// empty; that value is a placeholder, not a quote.
    pub fn max_volume_price(&self, side: Side) -> Price {
        let mut best: Option<&PriceLevel> = None;
        for level in self.levels(side) {
            if best.map_or(true, |b| level.size() > b.size()) {
                best = Some(level);
            }
        }
        best.map_or(0, |level| level.price)
    }

    /// Average of the two sides' max-volume prices.
    pub fn max_volume_mid(&self) -> f64 {
        (self.max_volume_price(Side::Bid) + self.max_volume_price(Side::Ask)) as f64 / 2.0
    }

    /// Signed quantity resting at exactly `price`, or 0.
    pub fn amount_at(&self, side: Side, price: Price) -> Quantity {
        self.levels(side)
            .find(|level| level.price == price)
            .map_or(0, |level| level.quantity)
    }

    /// Sum of sizes across retained levels of one side.
    pub fn total_volume(&self, side: Side) -> Quantity {
        self.levels(side).map(PriceLevel::size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_sided() -> BookSnapshot {
        BookSnapshot::from_levels([(100, 5), (99, 3)], [(101, 4), (102, 2)])
    }

    #[test]
    fn test_two_sided_derived_quantities() {
        let book = two_sided();
        let market = MarketState::new("X", &book);

        assert_eq!(market.best_bid(), Some(100));
        assert_eq!(market.best_ask(), Some(101));
        assert_eq!(market.worst_bid(), Some(99));
        assert_eq!(market.worst_ask(), Some(102));
        assert_eq!(market.spread(), Some(1));
        assert_relative_eq!(market.mid().unwrap(), 100.5);
        // (100*5 + 99*3 + 101*4 + 102*2) / 14
        assert_relative_eq!(market.vwap().unwrap(), 1405.0 / 14.0);
        assert_relative_eq!(market.vwap().unwrap(), 100.357, epsilon = 1e-3);
    }

    #[test]
    fn test_one_sided_book_synthesizes_ask() {
        let book = BookSnapshot::from_levels([(100, 5)], []);
        let market = MarketState::new("X", &book);

        assert_eq!(market.best_ask(), Some(101));
        assert_eq!(market.worst_ask(), Some(101));
        assert_relative_eq!(market.mid().unwrap(), 100.5);
        assert_eq!(market.best_ask_amount(), 0);
        assert_eq!(market.level_vwap_ask(), None);
    }

    #[test]
    fn test_one_sided_book_synthesizes_bid() {
        let book = BookSnapshot::from_levels([], [(101, 4), (103, 1)]);
        let market = MarketState::new("X", &book);

        assert_eq!(market.best_bid(), Some(100));
        assert_eq!(market.worst_bid(), Some(100));
        assert_eq!(market.worst_ask(), Some(103));
    }

    #[test]
    fn test_empty_book_has_no_prices() {
        let book = BookSnapshot::empty();
        let market = MarketState::new("X", &book);

        assert_eq!(market.best_bid(), None);
        assert_eq!(market.best_ask(), None);
        assert_eq!(market.mid(), None);
        assert_eq!(market.spread(), None);
        assert_eq!(market.vwap(), None);
        assert_eq!(market.max_volume_price(Side::Bid), 0);
        assert_eq!(market.total_volume(Side::Ask), 0);
    }

    #[test]
    fn test_side_vwaps() {
        let book = two_sided();
        let market = MarketState::new("X", &book);

        assert_relative_eq!(market.level_vwap_bid().unwrap(), (500.0 + 297.0) / 8.0);
        assert_relative_eq!(market.level_vwap_ask().unwrap(), (404.0 + 204.0) / 6.0);
    }

    #[test]
    fn test_max_volume_price_ties_keep_first() {
        let book = BookSnapshot::from_levels([(100, 3), (99, 7), (98, 7)], [(101, 2), (102, 2)]);
        let market = MarketState::new("X", &book);

        assert_eq!(market.max_volume_price(Side::Bid), 99);
        assert_eq!(market.max_volume_price(Side::Ask), 101);
        assert_relative_eq!(market.max_volume_mid(), 100.0);
    }

    #[test]
    fn test_amounts_and_totals() {
        let book = two_sided();
        let market = MarketState::new("X", &book);

        assert_eq!(market.amount_at(Side::Bid, 99), 3);
        assert_eq!(market.amount_at(Side::Ask, 102), -2);
        assert_eq!(market.amount_at(Side::Ask, 150), 0);
        assert_eq!(market.total_volume(Side::Bid), 8);
        assert_eq!(market.total_volume(Side::Ask), 6);
        assert_eq!(market.best_ask_amount(), 4);
    }
}
