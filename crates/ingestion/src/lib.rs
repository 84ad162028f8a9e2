//! Data ingestion and normalization for the tick replay system.
//!
//! This crate handles:
//! - Reading delimited price files
//! - Building book snapshots from level columns
//! - Grouping rows into per-timestamp market frames

pub mod frame_builder;
pub mod rows;

pub use frame_builder::{build_frames, FrameBuilder};
pub use rows::{read_price_file, read_price_rows, PriceRow};
