//! Append-only per-symbol book history.
//!
//! Each symbol keeps twelve parallel series (price and volume for three
//! levels on each side) plus fast and slow EMAs of the mid price. Every
//! `record_tick` appends one element to all twelve series, so they always
//! have equal length. Series are never evicted.

use std::collections::BTreeMap;

use tickreplay_core::config::HistoryConfig;
use tickreplay_core::{BookSnapshot, Error, PriceLevel, Result, Side, Symbol, MAX_LEVELS};

use crate::book::volume_weighted_price;
use crate::ema::{crossover, Cross, Ema};

/// One recorded value; `None` marks a missing level.
pub type Sample = Option<i64>;

/// Which column of a level to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryField {
    BidPrice,
    BidVolume,
    AskPrice,
    AskVolume,
}

impl HistoryField {
    /// Book side of this field.
    pub fn side(self) -> Side {
        match self {
            HistoryField::BidPrice | HistoryField::BidVolume => Side::Bid,
            HistoryField::AskPrice | HistoryField::AskVolume => Side::Ask,
        }
    }

    fn column(self, level: usize) -> Result<usize> {
        if !(1..=MAX_LEVELS).contains(&level) {
            return Err(Error::InvalidLevel(level));
        }
        Ok(index(self, level - 1))
    }
}

const COLUMNS: usize = 4 * MAX_LEVELS;

#[inline]
fn index(field: HistoryField, slot: usize) -> usize {
    field as usize * MAX_LEVELS + slot
}

/// History of one symbol.
#[derive(Debug, Clone)]
pub struct SymbolHistory {
    columns: [Vec<Sample>; COLUMNS],
    ema_fast: Ema,
    ema_slow: Ema,
}

impl SymbolHistory {
    fn new(fast_alpha: f64, slow_alpha: f64) -> Self {
        Self {
            columns: Default::default(),
            ema_fast: Ema::new(fast_alpha),
            ema_slow: Ema::new(slow_alpha),
        }
    }

    /// Number of recorded ticks.
    pub fn len(&self) -> usize {
        self.columns[0].len()
    }

    /// Whether no tick has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&mut self, book: &BookSnapshot) {
        for (side, price_field, volume_field) in [
            (Side::Bid, HistoryField::BidPrice, HistoryField::BidVolume),
            (Side::Ask, HistoryField::AskPrice, HistoryField::AskVolume),
        ] {
            for (slot, level) in book.slots(side).iter().enumerate() {
                self.columns[index(price_field, slot)].push(level.map(|l| l.price));
                self.columns[index(volume_field, slot)].push(level.map(|l| l.quantity));
            }
        }
    }

    /// Last `size` samples of one series, oldest first. Never padded.
    pub fn window(&self, field: HistoryField, level: usize, size: usize) -> Result<&[Sample]> {
        let series = &self.columns[field.column(level)?];
        Ok(&series[series.len().saturating_sub(size)..])
    }

    /// Level-1 mid price per tick over the last `size` ticks.
    pub fn rolling_mid(&self, size: usize) -> Vec<Option<f64>> {
        let bids = &self.columns[index(HistoryField::BidPrice, 0)];
        let asks = &self.columns[index(HistoryField::AskPrice, 0)];
        let start = bids.len().saturating_sub(size);

        bids[start..]
            .iter()
            .zip(&asks[start..])
            .map(|(bid, ask)| Some(((*bid)? + (*ask)?) as f64 / 2.0))
            .collect()
    }

    /// All-level volume-weighted price per tick over the last `size` ticks.
    pub fn rolling_vwap(&self, size: usize) -> Vec<Option<f64>> {
        let start = self.len().saturating_sub(size);
        (start..self.len()).map(|tick| self.tick_vwap(tick)).collect()
    }

    fn tick_vwap(&self, tick: usize) -> Option<f64> {
        let mut levels = Vec::with_capacity(COLUMNS / 2);
        for (price_field, volume_field) in [
            (HistoryField::BidPrice, HistoryField::BidVolume),
            (HistoryField::AskPrice, HistoryField::AskVolume),
        ] {
            for slot in 0..MAX_LEVELS {
                let price = self.columns[index(price_field, slot)][tick];
                let quantity = self.columns[index(volume_field, slot)][tick];
                if let (Some(price), Some(quantity)) = (price, quantity) {
                    levels.push(PriceLevel { price, quantity });
                }
            }
        }
        volume_weighted_price(&levels)
    }

    /// Fold this tick's mid into both EMAs.
    ///
    /// Without a mid the previous values are carried forward; before the
    /// first mid this is a no-op.
    pub fn update_ema(&mut self, mid: Option<f64>) {
        match mid {
            Some(mid) => {
                self.ema_fast.update(mid);
                self.ema_slow.update(mid);
            }
            None => {
                self.ema_fast.carry_forward();
                self.ema_slow.carry_forward();
            }
        }
    }

    /// Fast EMA.
    pub fn ema_fast(&self) -> &Ema {
        &self.ema_fast
    }

    /// Slow EMA.
    pub fn ema_slow(&self) -> &Ema {
        &self.ema_slow
    }

    /// Fast/slow crossover on the latest tick.
    pub fn ema_cross(&self) -> Option<Cross> {
        crossover(&self.ema_fast, &self.ema_slow)
    }
}

/// History for every symbol seen during a replay.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    fast_alpha: f64,
    slow_alpha: f64,
    symbols: BTreeMap<Symbol, SymbolHistory>,
}

impl HistoryBuffer {
    /// Create an empty buffer.
    pub fn new(config: &HistoryConfig) -> Self {
        Self::with_alphas(config.fast_alpha(), config.slow_alpha())
    }

    /// Create an empty buffer with explicit EMA smoothing factors.
    pub fn with_alphas(fast_alpha: f64, slow_alpha: f64) -> Self {
        Self {
            fast_alpha,
            slow_alpha,
            symbols: BTreeMap::new(),
        }
    }

    fn entry(&mut self, symbol: &str) -> &mut SymbolHistory {
        let (fast, slow) = (self.fast_alpha, self.slow_alpha);
        self.symbols
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolHistory::new(fast, slow))
    }

    /// Append one tick of a symbol's book.
    pub fn record_tick(&mut self, symbol: &str, book: &BookSnapshot) {
        self.entry(symbol).record(book);
    }

    /// Fold a symbol's mid for this tick into its EMAs.
    pub fn update_ema(&mut self, symbol: &str, mid: Option<f64>) {
        self.entry(symbol).update_ema(mid);
    }

    /// History of one symbol, if it has been seen.
    pub fn get(&self, symbol: &str) -> Option<&SymbolHistory> {
        self.symbols.get(symbol)
    }

    /// Last `size` samples of one series. Empty for an unseen symbol.
    pub fn window(
        &self,
        symbol: &str,
        field: HistoryField,
        level: usize,
        size: usize,
    ) -> Result<&[Sample]> {
        match self.symbols.get(symbol) {
            Some(history) => history.window(field, level, size),
            None => {
                field.column(level)?;
                Ok(&[])
            }
        }
    }

    /// See [`SymbolHistory::rolling_mid`].
    pub fn rolling_mid(&self, symbol: &str, size: usize) -> Vec<Option<f64>> {
        self.symbols
            .get(symbol)
            .map(|h| h.rolling_mid(size))
            .unwrap_or_default()
    }

    /// See [`SymbolHistory::rolling_vwap`].
    pub fn rolling_vwap(&self, symbol: &str, size: usize) -> Vec<Option<f64>> {
        self.symbols
            .get(symbol)
            .map(|h| h.rolling_vwap(size))
            .unwrap_or_default()
    }

    /// Recorded ticks for a symbol.
    pub fn len(&self, symbol: &str) -> usize {
        self.symbols.get(symbol).map_or(0, SymbolHistory::len)
    }

    /// Symbols with history.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> + '_ {
        self.symbols.keys()
    }
}
