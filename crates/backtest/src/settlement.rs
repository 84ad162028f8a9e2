//! End-of-replay settlement.
//!
//! Folds the order ledger into cash and per-symbol inventory, then marks any
//! open inventory to the final frame. A one-sided final book is valued at its
//! available best price; an empty or missing book values at zero.

use serde::Serialize;
use std::collections::BTreeMap;

use tickreplay_core::{BookSnapshot, MarketFrame, Order, Quantity, Side, Symbol};

/// Settlement of one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolSettlement {
    /// Net cash flow from this symbol's orders.
    pub cash: i64,
    /// Final inventory.
    pub inventory: Quantity,
    /// Price used to value the inventory, if it was valued.
    pub mark_price: Option<f64>,
    /// `inventory * mark_price`.
    pub inventory_value: f64,
}

impl SymbolSettlement {
    /// Cash plus inventory value.
    pub fn pnl(&self) -> f64 {
        self.cash as f64 + self.inventory_value
    }
}

/// Settlement result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Settlement {
    /// Total cash flow.
    pub cash: i64,
    /// Total mark-to-market value of final inventory.
    pub inventory_value: f64,
    /// `cash + inventory_value`.
    pub pnl: f64,
    /// Per-symbol breakdown.
    pub symbols: BTreeMap<Symbol, SymbolSettlement>,
}

impl Settlement {
    /// Settle a ledger against the final frame.
    pub fn settle<'a, I>(orders: I, final_frame: Option<&MarketFrame>) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut settlement = Settlement::default();

        for order in orders {
            let entry = settlement.symbols.entry(order.symbol.clone()).or_default();
            entry.cash += order.cash_flow();
            entry.inventory += order.quantity;
            settlement.cash += order.cash_flow();
        }

        for (symbol, entry) in settlement.symbols.iter_mut() {
            if entry.inventory == 0 {
                continue;
            }

            match final_frame.and_then(|frame| frame.book(symbol)) {
                Some(book) => {
                    let mark = mark_price(book);
                    entry.mark_price = Some(mark);
                    entry.inventory_value = entry.inventory as f64 * mark;
                }
                None => {
                    tracing::warn!(
                        symbol = %symbol,
                        inventory = entry.inventory,
                        "no final book, inventory valued at zero"
                    );
                }
            }
            settlement.inventory_value += entry.inventory_value;
        }

        settlement.pnl = settlement.cash as f64 + settlement.inventory_value;
        settlement
    }

    /// Final inventory of a symbol.
    pub fn inventory(&self, symbol: &str) -> Quantity {
        self.symbols.get(symbol).map_or(0, |s| s.inventory)
    }
}

/// Reference price for valuing inventory.
///
/// Mid of the best levels, the available side's best price for a one-sided
/// book, or zero for an empty book.
pub fn mark_price(book: &BookSnapshot) -> f64 {
    let best = |side| book.levels(side).next().map(|level| level.price as f64);
    match (best(Side::Bid), best(Side::Ask)) {
        (Some(bid), Some(ask)) => (bid + ask) / 2.0,
        (Some(bid), None) => bid,
        (None, Some(ask)) => ask,
        (None, None) => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frame(symbol: &str, book: BookSnapshot) -> MarketFrame {
        MarketFrame::new(1000).with_book(symbol, book)
    }

    #[test]
    fn test_empty_ledger_is_zero() {
        let final_frame = frame("X", BookSnapshot::from_levels([(100, 5)], [(102, 5)]));
        let settlement = Settlement::settle(&[], Some(&final_frame));

        assert_eq!(settlement.cash, 0);
        assert_eq!(settlement.pnl, 0.0);
        assert!(settlement.symbols.is_empty());

        assert_eq!(Settlement::settle(&[], None).pnl, 0.0);
    }

    #[test]
    fn test_round_trip_cash_flow() {
        let orders = vec![Order::new("X", 100, 5), Order::new("X", 105, -5)];
        let final_frame = frame("X", BookSnapshot::from_levels([(200, 1)], [(202, 1)]));

        let settlement = Settlement::settle(&orders, Some(&final_frame));

        assert_eq!(settlement.cash, 25);
        assert_eq!(settlement.inventory("X"), 0);
        assert_eq!(settlement.symbols["X"].mark_price, None);
        assert_relative_eq!(settlement.pnl, 25.0);
    }

    #[test]
    fn test_open_inventory_marked_to_mid() {
        let orders = vec![Order::new("X", 100, 4), Order::new("X", 103, -1)];
        let final_frame = frame("X", BookSnapshot::from_levels([(101, 2)], [(104, 2)]));

        let settlement = Settlement::settle(&orders, Some(&final_frame));

        // cash = -400 + 103, inventory 3 @ 102.5
        assert_eq!(settlement.cash, -297);
        assert_relative_eq!(settlement.inventory_value, 307.5);
        assert_relative_eq!(settlement.pnl, 10.5);
        assert_relative_eq!(settlement.symbols["X"].pnl(), 10.5);
    }

    #[test]
    fn test_one_sided_and_empty_marks() {
        assert_relative_eq!(mark_price(&BookSnapshot::from_levels([(100, 1)], [])), 100.0);
        assert_relative_eq!(mark_price(&BookSnapshot::from_levels([], [(105, 1)])), 105.0);
        assert_relative_eq!(mark_price(&BookSnapshot::empty()), 0.0);

        let orders = vec![Order::new("X", 100, -2)];
        let final_frame = frame("X", BookSnapshot::empty());
        let settlement = Settlement::settle(&orders, Some(&final_frame));
        assert_relative_eq!(settlement.pnl, 200.0);
    }

    #[test]
    fn test_missing_symbol_valued_at_zero() {
        let orders = vec![Order::new("Y", 10, 3)];
        let final_frame = frame("X", BookSnapshot::from_levels([(100, 1)], [(101, 1)]));

        let settlement = Settlement::settle(&orders, Some(&final_frame));

        assert_eq!(settlement.symbols["Y"].mark_price, None);
        assert_relative_eq!(settlement.pnl, -30.0);
    }

    #[test]
    fn test_settlement_is_idempotent() {
        let orders = vec![
            Order::new("X", 100, 5),
            Order::new("Y", 50, -2),
            Order::new("X", 101, -1),
        ];
        let final_frame = MarketFrame::new(1)
            .with_book("X", BookSnapshot::from_levels([(99, 1)], [(102, 1)]))
            .with_book("Y", BookSnapshot::from_levels([(48, 1)], []));

        let first = Settlement::settle(&orders, Some(&final_frame));
        let second = Settlement::settle(&orders, Some(&final_frame));

        assert_eq!(first, second);
        assert_eq!(first.pnl.to_bits(), second.pnl.to_bits());
    }
}
