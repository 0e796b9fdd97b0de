//! TurtleLab Core — the position & risk simulation engine.
//!
//! This crate turns an ascending OHLCV series plus a [`TurtleConfig`] into a
//! trade ledger, an equity curve and a metrics summary:
//! - Domain types (bars, units, positions, ledger records)
//! - Indicator engine: Wilder ATR (N) and lagged Donchian channels
//! - Fill model: slippage, maker/taker fees, exchange quantity filters
//! - Position state machine: exit, stop, pyramid add, breakout entry
//! - Bar loop and performance metrics
//!
//! The engine is synchronous, deterministic and free of I/O.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod metrics;

pub use config::TurtleConfig;
pub use engine::{run_backtest, BacktestReport};
pub use error::{ConfigError, DataError, EngineError};
