//! Core types and configuration for the tick replay system.
//!
//! This crate provides shared types used across all other crates:
//! - Book snapshots, market frames and orders
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
