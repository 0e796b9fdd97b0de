//! TurtleLab Runner — everything around a backtest that touches the outside
//! world.
//!
//! This crate builds on `turtlelab-core` to provide:
//! - TOML run configuration with a content-addressed run id
//! - CSV bar loading with timestamp unit detection, plus a seeded synthetic series
//! - Single-run orchestration
//! - Artifact export (trade ledger, equity curve, round trips, JSON manifest)
//! - Parallel parameter sweeps

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, DataSource, RunConfig, RunId, RunSection};
pub use data_loader::{load, load_csv, synthetic_bars, LoadError, LoadedData};
pub use export::{import_manifest, save_artifacts, Manifest};
pub use runner::{run_from_data, run_single, BacktestResult, RunError, SCHEMA_VERSION};
pub use sweep::{ranked, run_sweep, ParamGrid, SweepRow};
