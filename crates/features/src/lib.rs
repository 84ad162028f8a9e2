//! Market-state features for the tick replay system.
//!
//! This crate handles:
//! - Derived book quantities (best/worst, mid, spread, VWAPs)
//! - Per-symbol book history with rolling windows
//! - Fast/slow mid-price EMAs

pub mod book;
pub mod ema;
pub mod history;

pub use book::MarketState;
pub use ema::{Cross, Ema};
pub use history::{HistoryBuffer, HistoryField, SymbolHistory};
