//! Parameter sweep over breakout lookbacks and stop distance.
//!
//! Every grid point is an independent backtest over the same bars, so the
//! grid runs on the rayon pool. Rows come back in grid order regardless of
//! scheduling.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use turtlelab_core::domain::Bar;
use turtlelab_core::engine::run_backtest;
use turtlelab_core::metrics::PerformanceMetrics;
use turtlelab_core::TurtleConfig;

/// Values to try for each swept parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub fast_lens: Vec<usize>,
    pub slow_lens: Vec<usize>,
    pub stop_multiples: Vec<f64>,
}

impl ParamGrid {
    /// Fast: 10, 20, 30
    /// Slow: 40, 55, 80
    /// Stop: 1.5N, 2N, 2.5N, 3N
    pub fn turtle_default() -> Self {
        Self {
            fast_lens: vec![10, 20, 30],
            slow_lens: vec![40, 55, 80],
            stop_multiples: vec![1.5, 2.0, 2.5, 3.0],
        }
    }

    /// Upper bound on the number of configurations; pairs with
    /// `fast >= slow` are dropped by [`ParamGrid::generate`].
    pub fn size(&self) -> usize {
        self.fast_lens.len() * self.slow_lens.len() * self.stop_multiples.len()
    }

    pub fn generate(&self, base: &TurtleConfig) -> Vec<TurtleConfig> {
        let mut configs = Vec::new();
        for &fast in &self.fast_lens {
            for &slow in &self.slow_lens {
                if fast >= slow {
                    continue;
                }
                for &stop in &self.stop_multiples {
                    let mut config = base.clone();
                    config.channels.entry_fast_len = fast;
                    config.channels.entry_slow_len = slow;
                    config.risk.stop_multiple = stop;
                    configs.push(config);
                }
            }
        }
        configs
    }
}

/// Outcome of one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub fast_len: usize,
    pub slow_len: usize,
    pub stop_multiple: f64,
    pub fills: usize,
    pub metrics: PerformanceMetrics,
}

/// Backtest every configuration in the grid against `bars`.
pub fn run_sweep(grid: &ParamGrid, base: &TurtleConfig, bars: &[Bar]) -> Result<Vec<SweepRow>> {
    let configs = grid.generate(base);
    info!(configs = configs.len(), bars = bars.len(), "sweep started");

    let rows = configs
        .par_iter()
        .map(|config| {
            let report = run_backtest(bars, config).with_context(|| {
                format!(
                    "backtest failed for fast={} slow={} stop={}",
                    config.channels.entry_fast_len,
                    config.channels.entry_slow_len,
                    config.risk.stop_multiple
                )
            })?;
            Ok(SweepRow {
                fast_len: config.channels.entry_fast_len,
                slow_len: config.channels.entry_slow_len,
                stop_multiple: config.risk.stop_multiple,
                fills: report.trades.len(),
                metrics: report.metrics,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(rows = rows.len(), "sweep finished");
    Ok(rows)
}

/// Rows sorted by Sharpe, best first. Ties keep grid order.
pub fn ranked(rows: &[SweepRow]) -> Vec<&SweepRow> {
    let mut sorted: Vec<&SweepRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.metrics.sharpe.total_cmp(&a.metrics.sharpe));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::synthetic_bars;

    fn small_grid() -> ParamGrid {
        ParamGrid {
            fast_lens: vec![10, 20],
            slow_lens: vec![20, 40],
            stop_multiples: vec![2.0, 3.0],
        }
    }

    #[test]
    fn default_grid_size() {
        assert_eq!(ParamGrid::turtle_default().size(), 36);
        assert_eq!(
            ParamGrid::turtle_default()
                .generate(&TurtleConfig::default())
                .len(),
            36
        );
    }

    #[test]
    fn generate_skips_fast_not_below_slow() {
        let configs = small_grid().generate(&TurtleConfig::default());
        // (10,20) (10,40) (20,40), two stops each
        assert_eq!(configs.len(), 6);
        for c in &configs {
            assert!(c.channels.entry_fast_len < c.channels.entry_slow_len);
        }
    }

    #[test]
    fn generate_keeps_untouched_fields() {
        let mut base = TurtleConfig::default();
        base.risk.leverage = 2.5;
        base.rules.allow_short = false;
        for c in small_grid().generate(&base) {
            assert_eq!(c.risk.leverage, 2.5);
            assert!(!c.rules.allow_short);
        }
    }

    #[test]
    fn sweep_rows_follow_grid_order() {
        let bars = synthetic_bars(500, 7);
        let grid = small_grid();
        let rows = run_sweep(&grid, &TurtleConfig::default(), &bars).unwrap();
        let expected: Vec<(usize, usize, f64)> = grid
            .generate(&TurtleConfig::default())
            .iter()
            .map(|c| {
                (
                    c.channels.entry_fast_len,
                    c.channels.entry_slow_len,
                    c.risk.stop_multiple,
                )
            })
            .collect();
        let got: Vec<(usize, usize, f64)> = rows
            .iter()
            .map(|r| (r.fast_len, r.slow_len, r.stop_multiple))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn sweep_matches_single_runs() {
        let bars = synthetic_bars(400, 3);
        let base = TurtleConfig::default();
        let rows = run_sweep(&small_grid(), &base, &bars).unwrap();
        for (row, config) in rows.iter().zip(small_grid().generate(&base)) {
            let report = run_backtest(&bars, &config).unwrap();
            assert_eq!(row.metrics, report.metrics);
            assert_eq!(row.fills, report.trades.len());
        }
    }

    #[test]
    fn ranked_is_descending_by_sharpe() {
        let bars = synthetic_bars(600, 11);
        let rows = run_sweep(&small_grid(), &TurtleConfig::default(), &bars).unwrap();
        let sorted = ranked(&rows);
        assert_eq!(sorted.len(), rows.len());
        for pair in sorted.windows(2) {
            assert!(pair[0].metrics.sharpe >= pair[1].metrics.sharpe);
        }
    }

    #[test]
    fn invalid_base_fails_the_sweep() {
        let mut base = TurtleConfig::default();
        base.risk.risk_pct = 0.0;
        let bars = synthetic_bars(100, 1);
        assert!(run_sweep(&small_grid(), &base, &bars).is_err());
    }
}
