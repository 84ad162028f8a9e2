//! Error types for the tick replay system.

use thiserror::Error;

use crate::types::{Quantity, Symbol, Timestamp};

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tick replay system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid or missing data).
    #[error("Data error: {0}")]
    Data(String),

    /// A position update would breach the symbol's absolute limit.
    #[error("Position limit exceeded for {symbol}: attempted {attempted}, limit {limit}")]
    LimitExceeded {
        symbol: Symbol,
        attempted: Quantity,
        limit: Quantity,
    },

    /// Book level outside 1..=3.
    #[error("Invalid book level: {0}")]
    InvalidLevel(usize),

    /// Frame timestamps must be strictly increasing.
    #[error("Out-of-order frame: timestamp {current} after {previous}")]
    OutOfOrder {
        previous: Timestamp,
        current: Timestamp,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a limit breach error.
    pub fn limit_exceeded(symbol: impl Into<Symbol>, attempted: Quantity, limit: Quantity) -> Self {
        Error::LimitExceeded {
            symbol: symbol.into(),
            attempted,
            limit,
        }
    }

    /// Whether this error only invalidates the current tick.
    pub fn is_tick_fatal(&self) -> bool {
        matches!(self, Error::LimitExceeded { .. })
    }
}
