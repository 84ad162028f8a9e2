//! Snapshot replay and settlement for the tick replay system.
//!
//! This crate provides:
//! - Position and limit tracking
//! - The strategy contract and built-in strategies
//! - The per-tick replay engine
//! - End-of-replay settlement and per-tick telemetry

pub mod engine;
pub mod ledger;
pub mod position;
pub mod router;
pub mod settlement;
pub mod strategy;
pub mod telemetry;

pub use engine::{ReplayEngine, ReplayOutcome, ReplayPhase, TickReport};
pub use ledger::{LedgerEntry, OrderLedger};
pub use position::{PositionRecord, PositionTracker};
pub use router::{StrategyRouter, SymbolSummary};
pub use settlement::{Settlement, SymbolSettlement};
pub use strategy::{AnyStrategy, EmaCrossover, MeanReversionBand, Strategy, StrategyContext};
pub use telemetry::TelemetryLogger;
