//! Position and risk-limit tracking for backtesting.
//!
//! Keeps two views per symbol: the authoritative position reported by the
//! feed at the start of a tick, and the optimistic position the strategies
//! build up while emitting orders during that tick.

use serde::Serialize;
use std::collections::BTreeMap;

use tickreplay_core::config::PositionLimits;
use tickreplay_core::{Error, Quantity, Result, Symbol};

/// Both position views of one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PositionRecord {
    /// Feed-reported position, fixed for the tick.
    pub authoritative: Quantity,
    /// Strategy-simulated running position.
    pub optimistic: Quantity,
}

/// Position tracker enforcing absolute per-symbol limits.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    /// Absolute limit per symbol.
    limits: PositionLimits,
    /// Position views per symbol.
    records: BTreeMap<Symbol, PositionRecord>,
}

impl PositionTracker {
    /// Create a tracker with every position flat.
    pub fn new(limits: PositionLimits) -> Self {
        Self {
            limits,
            records: BTreeMap::new(),
        }
    }

    /// Absolute limit of a symbol.
    pub fn limit(&self, symbol: &str) -> Quantity {
        self.limits.get(symbol)
    }

    /// Both views of a symbol.
    pub fn record(&self, symbol: &str) -> PositionRecord {
        self.records.get(symbol).copied().unwrap_or_default()
    }

    /// Authoritative position.
    pub fn authoritative(&self, symbol: &str) -> Quantity {
        self.record(symbol).authoritative
    }

    /// Optimistic position.
    pub fn optimistic(&self, symbol: &str) -> Quantity {
        self.record(symbol).optimistic
    }

    /// Overwrite the authoritative view.
    pub fn set_authoritative(&mut self, symbol: &str, value: Quantity) {
        self.records.entry(symbol.to_string()).or_default().authoritative = value;
    }

    /// Commit a new optimistic position.
    ///
    /// Fails with [`Error::LimitExceeded`] if `|new_value|` exceeds the limit,
    /// leaving the previous value in place.
    pub fn update_optimistic(&mut self, symbol: &str, new_value: Quantity) -> Result<()> {
        let limit = self.limit(symbol);
        if new_value.abs() > limit {
            return Err(Error::limit_exceeded(symbol, new_value, limit));
        }
        self.records.entry(symbol.to_string()).or_default().optimistic = new_value;
        Ok(())
    }

    /// Quantity that can still be bought under both views. Never negative.
    pub fn room_to_buy(&self, symbol: &str) -> Quantity {
        let limit = self.limit(symbol);
        let record = self.record(symbol);
        (limit - record.optimistic)
            .min(limit - record.authoritative)
            .max(0)
    }

    /// Quantity that can still be sold under both views. Never negative.
    pub fn room_to_sell(&self, symbol: &str) -> Quantity {
        let limit = self.limit(symbol);
        let record = self.record(symbol);
        (limit + record.optimistic)
            .min(limit + record.authoritative)
            .max(0)
    }

    /// All tracked symbols and their views.
    pub fn records(&self) -> &BTreeMap<Symbol, PositionRecord> {
        &self.records
    }
}
