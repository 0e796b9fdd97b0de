//! Backtest runner — wires together data loading, the engine and metrics.
//!
//! Two entry points:
//! - `run_single()`: loads bars from the configured source, then runs. Used by the CLI.
//! - `run_from_data()`: takes pre-loaded bars. Used by the sweep and tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use turtlelab_core::engine::{run_backtest, BacktestReport};
use turtlelab_core::{EngineError, TurtleConfig};

use crate::config::{ConfigError, RunConfig, RunId};
use crate::data_loader::{load, LoadError, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to fingerprint config: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub symbol: String,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub bar_count: usize,
    pub config: TurtleConfig,
    pub report: BacktestReport,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Load the configured bars and run.
pub fn run_single(config: &RunConfig) -> Result<BacktestResult, RunError> {
    let source = config.data_source()?;
    let data = load(&source)?;
    run_from_data(config, &data)
}

/// Run on pre-loaded bars — no I/O.
pub fn run_from_data(config: &RunConfig, data: &LoadedData) -> Result<BacktestResult, RunError> {
    let run_id = config.run_id()?;
    info!(run_id = %run_id, symbol = %config.run.symbol, "run started");
    let report = run_backtest(&data.bars, &config.strategy)?;
    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        symbol: config.run.symbol.clone(),
        dataset_hash: data.dataset_hash.clone(),
        synthetic: data.synthetic,
        bar_count: data.bars.len(),
        config: config.strategy.clone(),
        report,
    })
}
