//! Error taxonomy for the engine.
//!
//! Only configuration and data problems are errors, and both are reported
//! before the first bar is simulated. Sizing rejections, not-ready bars and
//! degenerate arithmetic are ordinary outcomes, not errors.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Invalid strategy configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroLength { field: &'static str },

    #[error("{field} must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be non-negative and finite, got {value}")]
    Negative { field: &'static str, value: f64 },
}

/// Invalid bar series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("bar {index} at {timestamp} has a non-finite price or volume")]
    NonFinite {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("bar {index} repeats timestamp {timestamp}")]
    DuplicateTimestamp {
        index: usize,
        timestamp: NaiveDateTime,
    },

    #[error("bar {index} at {timestamp} is earlier than the previous bar at {previous}")]
    NonAscending {
        index: usize,
        timestamp: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

/// Fatal errors from [`run_backtest`](crate::engine::run_backtest).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid bar data: {0}")]
    Data(#[from] DataError),
}
