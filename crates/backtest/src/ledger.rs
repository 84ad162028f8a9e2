//! Append-only order ledger.

use serde::Serialize;

use tickreplay_core::{Order, Timestamp};

/// An order and the tick it was emitted on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Tick the order was emitted on.
    pub timestamp: Timestamp,
    /// The order as emitted.
    pub order: Order,
}

/// Chronological record of every emitted order.
#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    entries: Vec<LedgerEntry>,
}

impl OrderLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order.
    pub fn record(&mut self, timestamp: Timestamp, order: Order) {
        self.entries.push(LedgerEntry { timestamp, order });
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// All orders, oldest first.
    pub fn orders(&self) -> impl Iterator<Item = &Order> + '_ {
        self.entries.iter().map(|entry| &entry.order)
    }

    /// Number of orders.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no order has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
