//! Market frame building from price rows.
//!
//! Groups rows with identical timestamps into one frame, in ascending
//! timestamp order regardless of row order in the input.

use std::collections::BTreeMap;

use tickreplay_core::{MarketFrame, Timestamp};

use crate::rows::PriceRow;

/// Builder for market frames from price rows.
#[derive(Debug, Default)]
pub struct FrameBuilder {
    /// Frames being built, keyed by timestamp.
    frames: BTreeMap<Timestamp, MarketFrame>,
    /// Rows that replaced an earlier row for the same timestamp and symbol.
    replaced_rows: usize,
}

impl FrameBuilder {
    /// Create a new frame builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one row. A later row for the same `(timestamp, symbol)` wins.
    pub fn add_row(&mut self, row: &PriceRow) {
        let frame = self
            .frames
            .entry(row.timestamp)
            .or_insert_with(|| MarketFrame::new(row.timestamp));

        if frame.insert(row.symbol.clone(), row.to_book()).is_some() {
            self.replaced_rows += 1;
            tracing::warn!(
                timestamp = row.timestamp,
                symbol = %row.symbol,
                "duplicate price row replaces earlier row"
            );
        }
    }

    /// Add multiple rows.
    pub fn add_rows<'a>(&mut self, rows: impl IntoIterator<Item = &'a PriceRow>) {
        for row in rows {
            self.add_row(row);
        }
    }

    /// Number of distinct timestamps seen.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of duplicate rows that replaced an earlier one.
    pub fn replaced_rows(&self) -> usize {
        self.replaced_rows
    }

    /// Finish building, returning frames in ascending timestamp order.
    pub fn finish(self) -> Vec<MarketFrame> {
        self.frames.into_values().collect()
    }
}

/// Group rows into frames in one call.
pub fn build_frames<'a>(rows: impl IntoIterator<Item = &'a PriceRow>) -> Vec<MarketFrame> {
    let mut builder = FrameBuilder::new();
    builder.add_rows(rows);
    builder.finish()
}
