//! Artifact export — trade ledger, equity curve and round trips as CSV, plus
//! a JSON manifest.
//!
//! The manifest carries a `schema_version`; unknown versions are rejected on
//! load. Non-finite metric values serialize as `null` and load back as NaN.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use turtlelab_core::domain::{EquitySample, TradeRecord};
use turtlelab_core::engine::DirectionalMemory;
use turtlelab_core::metrics::{PerformanceMetrics, RoundTrip};
use turtlelab_core::TurtleConfig;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Summary written next to the CSV artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub run_id: String,
    pub symbol: String,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub bar_count: usize,
    pub ready_bars: usize,
    pub open_at_end: bool,
    pub config: TurtleConfig,
    pub metrics: PerformanceMetrics,
    pub memory: DirectionalMemory,
    pub generated_by: String,
}

impl Manifest {
    pub fn from_result(result: &BacktestResult) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: result.run_id.clone(),
            symbol: result.symbol.clone(),
            dataset_hash: result.dataset_hash.clone(),
            synthetic: result.synthetic,
            bar_count: result.bar_count,
            ready_bars: result.report.ready_bars,
            open_at_end: result.report.open_at_end,
            config: result.config.clone(),
            metrics: result.report.metrics.clone(),
            memory: result.report.memory,
            generated_by: concat!("turtlelab ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ─── JSON ───────────────────────────────────────────────────────────

pub fn manifest_json(manifest: &Manifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize manifest to JSON")
}

/// Deserialize a manifest, rejecting unknown schema versions.
pub fn import_manifest(json: &str) -> Result<Manifest> {
    let manifest: Manifest =
        serde_json::from_str(json).context("failed to deserialize manifest from JSON")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Columns: timestamp, side, action, price, quantity, fee, slippage, annotation
pub fn trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "side",
        "action",
        "price",
        "quantity",
        "fee",
        "slippage",
        "annotation",
    ])?;
    for t in trades {
        wtr.write_record([
            t.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            t.side.to_string(),
            t.action.as_str().to_string(),
            format!("{:.8}", t.price),
            format!("{:.8}", t.quantity),
            format!("{:.8}", t.fee),
            format!("{:.8}", t.slippage),
            t.annotation.clone(),
        ])?;
    }
    finish(wtr)
}

/// Columns: timestamp, equity
pub fn equity_csv(equity: &[EquitySample]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for s in equity {
        wtr.write_record([
            s.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.6}", s.equity),
        ])?;
    }
    finish(wtr)
}

/// One row per closed position.
pub fn round_trips_csv(trips: &[RoundTrip]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "entry_signal",
        "opened_at",
        "closed_at",
        "units",
        "quantity",
        "average_entry",
        "exit_price",
        "exit_action",
        "gross_pnl",
        "fees",
        "net_pnl",
    ])?;
    for t in trips {
        wtr.write_record([
            t.side.to_string(),
            t.entry_signal.clone(),
            t.opened_at.format(TIMESTAMP_FORMAT).to_string(),
            t.closed_at.format(TIMESTAMP_FORMAT).to_string(),
            t.units.to_string(),
            format!("{:.8}", t.quantity),
            format!("{:.8}", t.average_entry),
            format!("{:.8}", t.exit_price),
            t.exit_action.as_str().to_string(),
            format!("{:.2}", t.gross_pnl),
            format!("{:.2}", t.fees),
            format!("{:.2}", t.net_pnl),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Files ──────────────────────────────────────────────────────────

/// Write all artifacts to `<output_dir>/<run id prefix>/` and return that
/// directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id = result.run_id.get(..12).unwrap_or(&result.run_id);
    let dir = output_dir.join(short_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let report = &result.report;
    write(&dir, "trades.csv", &trades_csv(&report.trades)?)?;
    write(&dir, "equity.csv", &equity_csv(&report.equity_curve)?)?;
    write(&dir, "round_trips.csv", &round_trips_csv(&report.round_trips)?)?;
    write(
        &dir,
        "manifest.json",
        &manifest_json(&Manifest::from_result(result))?,
    )?;

    info!(dir = %dir.display(), "artifacts written");
    Ok(dir)
}

fn write(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}
