//! Price file rows.
//!
//! One row carries one symbol's top three levels per side at one timestamp.
//! Empty cells deserialize as absent; unknown columns are ignored.

use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tickreplay_core::{BookSnapshot, Error, Price, Quantity, Result, Symbol, Timestamp};

/// One row of the price file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceRow {
    /// Row timestamp.
    pub timestamp: Timestamp,
    /// Instrument.
    #[serde(rename = "product")]
    pub symbol: Symbol,
    pub bid_price_1: Option<f64>,
    pub bid_volume_1: Option<f64>,
    pub bid_price_2: Option<f64>,
    pub bid_volume_2: Option<f64>,
    pub bid_price_3: Option<f64>,
    pub bid_volume_3: Option<f64>,
    pub ask_price_1: Option<f64>,
    pub ask_volume_1: Option<f64>,
    pub ask_price_2: Option<f64>,
    pub ask_volume_2: Option<f64>,
    pub ask_price_3: Option<f64>,
    pub ask_volume_3: Option<f64>,
}

impl PriceRow {
    /// Present bid levels as `(price, size)`.
    pub fn bids(&self) -> Vec<(Price, Quantity)> {
        present_levels([
            (self.bid_price_1, self.bid_volume_1),
            (self.bid_price_2, self.bid_volume_2),
            (self.bid_price_3, self.bid_volume_3),
        ])
    }

    /// Present ask levels as `(price, size)`.
    pub fn asks(&self) -> Vec<(Price, Quantity)> {
        present_levels([
            (self.ask_price_1, self.ask_volume_1),
            (self.ask_price_2, self.ask_volume_2),
            (self.ask_price_3, self.ask_volume_3),
        ])
    }

    /// Book snapshot for this row. Zero or absent volumes are not levels.
    pub fn to_book(&self) -> BookSnapshot {
        BookSnapshot::from_levels(self.bids(), self.asks())
    }
}

fn present_levels(cells: [(Option<f64>, Option<f64>); 3]) -> Vec<(Price, Quantity)> {
    cells
        .into_iter()
        .filter_map(|(price, volume)| match (price, volume) {
            (Some(price), Some(volume)) if volume > 0.0 => {
                Some((price as Price, volume as Quantity))
            }
            _ => None,
        })
        .collect()
}

/// Parse price rows from a delimited reader with a header line.
pub fn read_price_rows<R: Read>(reader: R, delimiter: u8) -> Result<Vec<PriceRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, record) in csv_reader.deserialize::<PriceRow>().enumerate() {
        let row = record.map_err(|e| Error::data(format!("price row {}: {}", i + 1, e)))?;
        rows.push(row);
    }

    tracing::debug!(rows = rows.len(), "parsed price rows");
    Ok(rows)
}

/// Parse a price file from disk.
pub fn read_price_file(path: impl AsRef<Path>, delimiter: u8) -> Result<Vec<PriceRow>> {
    let file = File::open(path)?;
    read_price_rows(file, delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickreplay_core::Side;

    const HEADER: &str = "day;timestamp;product;bid_price_1;bid_volume_1;bid_price_2;bid_volume_2;bid_price_3;bid_volume_3;ask_price_1;ask_volume_1;ask_price_2;ask_volume_2;ask_price_3;ask_volume_3;mid_price;profit_and_loss";

    #[test]
    fn test_parse_rows_with_missing_levels() {
        let data = format!(
            "{HEADER}\n\
             -2;0;KELP;2028;1;2026;2;;;2032;31;;;;;2030.0;0.0\n\
             -2;100;KELP;2025;24;;;;;2028;2;2029;0;;;2026.5;0.0\n"
        );

        let rows = read_price_rows(data.as_bytes(), b';').unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, 0);
        assert_eq!(rows[0].symbol, "KELP");
        assert_eq!(rows[0].bid_price_3, None);
        assert_eq!(rows[0].bids(), vec![(2028, 1), (2026, 2)]);
        assert_eq!(rows[0].asks(), vec![(2032, 31)]);

        // Zero volume at the second ask is not a level.
        assert_eq!(rows[1].asks(), vec![(2028, 2)]);
    }

    #[test]
    fn test_row_to_book() {
        let data = format!("{HEADER}\n-2;0;KELP;2028;1;2026;2;;;2032;31;;;;;2030.0;0.0\n");
        let rows = read_price_rows(data.as_bytes(), b';').unwrap();
        let book = rows[0].to_book();

        assert_eq!(book.depth(Side::Bid), 2);
        assert_eq!(book.level(Side::Ask, 1).unwrap().unwrap().quantity, -31);
        assert_eq!(book.level(Side::Ask, 2).unwrap(), None);
    }

    #[test]
    fn test_malformed_row_is_data_error() {
        let data = format!("{HEADER}\n-2;abc;KELP;;;;;;;;;;;;;;\n");
        let err = read_price_rows(data.as_bytes(), b';').unwrap_err();
        assert!(matches!(err, Error::Data(_)));
    }
}
