//! Backtest loop — one sequential pass over the bar series.
//!
//! Per bar:
//! 1. look up the indicator row; not-ready bars skip all decision logic
//! 2. run the state machine's checks (at most one trade)
//! 3. append the trade, then the mark-to-market equity sample at the close
//!
//! The sample is taken after the bar's decision, so a fill on bar t is
//! already reflected in bar t's equity.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TurtleConfig;
use crate::domain::{validate_series, Bar, EquitySample, TradeRecord};
use crate::error::EngineError;
use crate::indicators::IndicatorFrame;
use crate::metrics::{reconstruct_round_trips, PerformanceMetrics, RoundTrip};

use super::memory::DirectionalMemory;
use super::state_machine::{PositionState, PositionStateMachine};

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub trades: Vec<TradeRecord>,
    /// One sample per input bar, warm-up included.
    pub equity_curve: Vec<EquitySample>,
    pub round_trips: Vec<RoundTrip>,
    pub metrics: PerformanceMetrics,
    /// Bars on which the decision logic ran.
    pub ready_bars: usize,
    /// Directional memory at the end of the run.
    pub memory: DirectionalMemory,
    /// Whether a position was still open after the last bar.
    pub open_at_end: bool,
}

/// Run a backtest over `bars`.
///
/// Configuration and series are validated before the first bar is processed;
/// after that the run cannot fail.
pub fn run_backtest(bars: &[Bar], config: &TurtleConfig) -> Result<BacktestReport, EngineError> {
    config.validate()?;
    validate_series(bars)?;
    if config.risk.max_units == 0 {
        warn!("max_units is 0; no position can be opened");
    }

    let frame = IndicatorFrame::compute(bars, &config.channels);
    let mut machine = PositionStateMachine::new(config.clone());
    let mut trades = Vec::new();
    let mut equity_curve = Vec::with_capacity(bars.len());
    let mut ready_bars = 0;

    info!(
        bars = bars.len(),
        first_ready = ?frame.first_ready(),
        initial_capital = config.initial_capital,
        "backtest started"
    );

    for (t, bar) in bars.iter().enumerate() {
        if let Some(row) = frame.row(t) {
            ready_bars += 1;
            if let Some(trade) = machine.on_bar(bar, &row) {
                trades.push(trade);
            }
        }
        equity_curve.push(EquitySample {
            timestamp: bar.timestamp,
            equity: machine.mark_to_market(bar.close),
        });
    }

    let round_trips = reconstruct_round_trips(&trades);
    let metrics = PerformanceMetrics::compute(&equity_curve, &round_trips, config.periods_per_year);
    let open_at_end = !matches!(machine.state(), PositionState::Flat);

    info!(
        fills = trades.len(),
        round_trips = round_trips.len(),
        final_equity = metrics.final_equity,
        total_return = metrics.total_return,
        "backtest finished"
    );

    Ok(BacktestReport {
        trades,
        equity_curve,
        round_trips,
        metrics,
        ready_bars,
        memory: *machine.memory(),
        open_at_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, DataError};
    use crate::indicators::make_bars;

    #[test]
    fn empty_series_is_a_flat_run() {
        let report = run_backtest(&[], &TurtleConfig::default()).unwrap();
        assert!(report.trades.is_empty());
        assert!(report.equity_curve.is_empty());
        assert_eq!(report.metrics.final_equity, 0.0);
    }

    #[test]
    fn warmup_bars_keep_flat_equity() {
        let bars = make_bars(&[100.0; 30]);
        let report = run_backtest(&bars, &TurtleConfig::default()).unwrap();
        assert_eq!(report.equity_curve.len(), 30);
        assert_eq!(report.ready_bars, 0);
        assert!(report
            .equity_curve
            .iter()
            .all(|s| s.equity == 100_000.0));
    }

    #[test]
    fn invalid_config_fails_before_any_bar() {
        let mut config = TurtleConfig::default();
        config.risk.leverage = 0.0;
        let err = run_backtest(&make_bars(&[1.0, 2.0]), &config).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Config(ConfigError::NotPositive { field: "risk.leverage", .. })
        ));
    }

    #[test]
    fn bad_series_fails() {
        let mut bars = make_bars(&[100.0, 101.0, 102.0]);
        bars[2].timestamp = bars[1].timestamp;
        let err = run_backtest(&bars, &TurtleConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Data(DataError::DuplicateTimestamp { index: 2, .. })
        ));
    }
}
