//! Per-bar indicator table consumed by the backtest loop.

use super::{Atr, Donchian, Indicator};
use crate::config::ChannelConfig;
use crate::domain::Bar;

/// Every indicator the state machine reads at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRow {
    /// Volatility unit N.
    pub n: f64,
    pub entry_high_fast: f64,
    pub entry_low_fast: f64,
    pub entry_high_slow: f64,
    pub entry_low_slow: f64,
    /// Lowest low that closes longs.
    pub exit_low: f64,
    /// Highest high that closes shorts.
    pub exit_high: f64,
}

/// Column-oriented indicator values for a whole series.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    n: Vec<f64>,
    entry_high_fast: Vec<f64>,
    entry_low_fast: Vec<f64>,
    entry_high_slow: Vec<f64>,
    entry_low_slow: Vec<f64>,
    exit_low: Vec<f64>,
    exit_high: Vec<f64>,
}

impl IndicatorFrame {
    pub fn compute(bars: &[Bar], channels: &ChannelConfig) -> Self {
        let lag = channels.exclude_current_bar;
        let upper = |len| Donchian::upper(len).excluding_current(lag).compute(bars);
        let lower = |len| Donchian::lower(len).excluding_current(lag).compute(bars);

        Self {
            n: Atr::new(channels.atr_period).compute(bars),
            entry_high_fast: upper(channels.entry_fast_len),
            entry_low_fast: lower(channels.entry_fast_len),
            entry_high_slow: upper(channels.entry_slow_len),
            entry_low_slow: lower(channels.entry_slow_len),
            exit_low: lower(channels.exit_long_len),
            exit_high: upper(channels.exit_short_len),
        }
    }

    pub fn len(&self) -> usize {
        self.n.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n.is_empty()
    }

    /// The row at bar `t`, or `None` while any indicator is still warming up.
    pub fn row(&self, t: usize) -> Option<IndicatorRow> {
        let row = IndicatorRow {
            n: *self.n.get(t)?,
            entry_high_fast: self.entry_high_fast[t],
            entry_low_fast: self.entry_low_fast[t],
            entry_high_slow: self.entry_high_slow[t],
            entry_low_slow: self.entry_low_slow[t],
            exit_low: self.exit_low[t],
            exit_high: self.exit_high[t],
        };
        let ready = [
            row.n,
            row.entry_high_fast,
            row.entry_low_fast,
            row.entry_high_slow,
            row.entry_low_slow,
            row.exit_low,
            row.exit_high,
        ]
        .iter()
        .all(|v| v.is_finite());
        ready.then_some(row)
    }

    pub fn is_ready(&self, t: usize) -> bool {
        self.row(t).is_some()
    }

    /// Index of the first bar the state machine will evaluate.
    pub fn first_ready(&self) -> Option<usize> {
        (0..self.len()).find(|&t| self.is_ready(t))
    }
}
