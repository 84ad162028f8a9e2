//! Core data types for the tick replay system.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Replay timestamp (non-negative, strictly increasing across frames).
pub type Timestamp = u64;

/// Integer price in ticks.
pub type Price = i64;

/// Signed quantity. Bids and buys are positive, asks and sells negative.
pub type Quantity = i64;

/// Opaque instrument identifier.
pub type Symbol = String;

/// State carried from one tick's strategy invocation to the next.
pub type TraderState = serde_json::Value;

/// Number of levels retained per side of a book.
pub const MAX_LEVELS: usize = 3;

/// One `(price, quantity)` pair on one side of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price.
    pub price: Price,
    /// Resting quantity (negative on the ask side).
    pub quantity: Quantity,
}

impl PriceLevel {
    /// Resting size regardless of side.
    #[inline]
    pub fn size(&self) -> Quantity {
        self.quantity.abs()
    }
}

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Quantity sign used for levels on this side.
    #[inline]
    pub fn sign(self) -> Quantity {
        match self {
            Side::Bid => 1,
            Side::Ask => -1,
        }
    }
}

/// Up to three levels per side for one symbol at one tick.
///
/// Bids are sorted by descending price and asks by ascending price, so slot 0
/// is always the best level. Present levels are packed at the front of each
/// array; `None` marks a missing level and is never a synthesized price.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    bids: [Option<PriceLevel>; MAX_LEVELS],
    asks: [Option<PriceLevel>; MAX_LEVELS],
}

impl BookSnapshot {
    /// A book with no levels on either side.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot from unsigned `(price, size)` pairs per side.
    ///
    /// Non-positive sizes are skipped, a repeated price keeps the last size,
    /// and levels beyond the third are dropped. Ask sizes are stored negated.
    pub fn from_levels<B, A>(bids: B, asks: A) -> Self
    where
        B: IntoIterator<Item = (Price, Quantity)>,
        A: IntoIterator<Item = (Price, Quantity)>,
    {
        Self {
            bids: pack_side(bids, Side::Bid),
            asks: pack_side(asks, Side::Ask),
        }
    }

    /// All three slots of one side, best first.
    #[inline]
    pub fn slots(&self, side: Side) -> &[Option<PriceLevel>; MAX_LEVELS] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Present levels of one side, best first.
    pub fn levels(&self, side: Side) -> impl Iterator<Item = &PriceLevel> + '_ {
        self.slots(side).iter().flatten()
    }

    /// Level `level` (1-based) of one side.
    pub fn level(&self, side: Side, level: usize) -> Result<Option<PriceLevel>> {
        if !(1..=MAX_LEVELS).contains(&level) {
            return Err(Error::InvalidLevel(level));
        }
        Ok(self.slots(side)[level - 1])
    }

    /// Number of present levels on one side.
    pub fn depth(&self, side: Side) -> usize {
        self.levels(side).count()
    }

    /// Whether one side has no levels.
    #[inline]
    pub fn side_is_empty(&self, side: Side) -> bool {
        self.slots(side)[0].is_none()
    }

    /// Whether both sides are empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.side_is_empty(Side::Bid) && self.side_is_empty(Side::Ask)
    }
}

fn pack_side<I>(levels: I, side: Side) -> [Option<PriceLevel>; MAX_LEVELS]
where
    I: IntoIterator<Item = (Price, Quantity)>,
{
    let by_price: BTreeMap<Price, Quantity> = levels
        .into_iter()
        .filter(|&(_, size)| size > 0)
        .collect();

    let ordered: Vec<(Price, Quantity)> = match side {
        Side::Bid => by_price.into_iter().rev().collect(),
        Side::Ask => by_price.into_iter().collect(),
    };

    let mut slots = [None; MAX_LEVELS];
    for (slot, (price, size)) in slots.iter_mut().zip(ordered) {
        *slot = Some(PriceLevel {
            price,
            quantity: size * side.sign(),
        });
    }
    slots
}

/// Cross-symbol market snapshot valid for exactly one timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketFrame {
    /// Frame timestamp.
    pub timestamp: Timestamp,
    /// Books keyed by symbol, iterated in ascending symbol order.
    pub books: BTreeMap<Symbol, BookSnapshot>,
}

impl MarketFrame {
    /// Create an empty frame.
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            books: BTreeMap::new(),
        }
    }

    /// Insert or replace a symbol's book. Returns the replaced book, if any.
    pub fn insert(
        &mut self,
        symbol: impl Into<Symbol>,
        book: BookSnapshot,
    ) -> Option<BookSnapshot> {
        self.books.insert(symbol.into(), book)
    }

    /// Builder-style insert.
    pub fn with_book(mut self, symbol: impl Into<Symbol>, book: BookSnapshot) -> Self {
        self.insert(symbol, book);
        self
    }

    /// Book for a symbol, if present this tick.
    pub fn book(&self, symbol: &str) -> Option<&BookSnapshot> {
        self.books.get(symbol)
    }

    /// Symbols present this tick, in processing order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.books.keys()
    }
}

/// An order emitted by a strategy. Assumed to execute in full at `price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Instrument.
    pub symbol: Symbol,
    /// Execution price.
    pub price: Price,
    /// Signed quantity: positive buys, negative sells.
    pub quantity: Quantity,
}

impl Order {
    /// Create an order.
    pub fn new(symbol: impl Into<Symbol>, price: Price, quantity: Quantity) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            quantity,
        }
    }

    /// Is this a buy?
    #[inline]
    pub fn is_buy(&self) -> bool {
        self.quantity > 0
    }

    /// Cash impact of executing this order: `-price * quantity`.
    #[inline]
    pub fn cash_flow(&self) -> i64 {
        -self.price * self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_sorting_and_sign() {
        let book = BookSnapshot::from_levels([(99, 3), (100, 5)], [(102, 2), (101, 4)]);

        let bids: Vec<_> = book.levels(Side::Bid).copied().collect();
        let asks: Vec<_> = book.levels(Side::Ask).copied().collect();

        assert_eq!(bids[0], PriceLevel { price: 100, quantity: 5 });
        assert_eq!(bids[1], PriceLevel { price: 99, quantity: 3 });
        assert_eq!(asks[0], PriceLevel { price: 101, quantity: -4 });
        assert_eq!(asks[1], PriceLevel { price: 102, quantity: -2 });
        assert_eq!(book.level(Side::Ask, 3).unwrap(), None);
    }

    #[test]
    fn test_book_truncates_to_three_levels() {
        let book = BookSnapshot::from_levels([(100, 1), (99, 1), (98, 1), (97, 50)], []);

        assert_eq!(book.depth(Side::Bid), 3);
        assert_eq!(book.level(Side::Bid, 3).unwrap().unwrap().price, 98);
        assert!(book.side_is_empty(Side::Ask));
        assert!(!book.is_empty());
    }

    #[test]
    fn test_book_skips_zero_volume() {
        let book = BookSnapshot::from_levels([(100, 0)], [(101, 0)]);
        assert!(book.is_empty());
    }

    #[test]
    fn test_invalid_level() {
        let book = BookSnapshot::empty();
        assert!(matches!(book.level(Side::Bid, 0), Err(Error::InvalidLevel(0))));
        assert!(matches!(book.level(Side::Bid, 4), Err(Error::InvalidLevel(4))));
    }

    #[test]
    fn test_order_cash_flow() {
        assert_eq!(Order::new("X", 100, 5).cash_flow(), -500);
        assert_eq!(Order::new("X", 105, -5).cash_flow(), 525);
        assert!(Order::new("X", 100, 1).is_buy());
    }

    #[test]
    fn test_frame_symbol_order() {
        let frame = MarketFrame::new(100)
            .with_book("KELP", BookSnapshot::empty())
            .with_book("AMETHYST", BookSnapshot::empty());

        let symbols: Vec<_> = frame.symbols().cloned().collect();
        assert_eq!(symbols, vec!["AMETHYST".to_string(), "KELP".to_string()]);
    }
}
