//! Property tests for engine invariants.
//!
//! Uses proptest over random walks to verify:
//! 1. Unit cap: no position ever holds more than `max_units` units
//! 2. Stop discipline: the stop sits exactly `stop_multiple × N` behind the
//!    most recent unit, and exists only while a position is open
//! 3. Determinism: identical inputs give identical reports
//! 4. Ledger consistency: replaying the ledger reproduces final equity

use chrono::NaiveDate;
use proptest::prelude::*;
use turtlelab_core::config::TurtleConfig;
use turtlelab_core::domain::{Bar, TradeAction};
use turtlelab_core::engine::{run_backtest, PositionStateMachine};
use turtlelab_core::indicators::IndicatorFrame;
use turtlelab_core::metrics::replay_ledger;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Bars from per-bar returns and range widths.
fn walk(steps: &[(f64, f64)]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2022, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut close = 100.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(ret, width))| {
            let open = close;
            close *= 1.0 + ret;
            Bar {
                timestamp: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) * (1.0 + width),
                low: open.min(close) * (1.0 - width),
                close,
                volume: 1.0,
            }
        })
        .collect()
}

fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-0.04..0.04_f64, 0.0..0.02_f64), 60..260).prop_map(|s| walk(&s))
}

fn arb_config() -> impl Strategy<Value = TurtleConfig> {
    (
        1usize..7,
        1.0..3.0_f64,
        0.25..1.0_f64,
        1.0..5.0_f64,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(max_units, stop, step, leverage, allow_short, with_costs)| {
            let mut config = if with_costs {
                TurtleConfig::default()
            } else {
                TurtleConfig::frictionless()
            };
            config.channels.entry_fast_len = 8;
            config.channels.entry_slow_len = 20;
            config.channels.exit_long_len = 4;
            config.channels.exit_short_len = 8;
            config.channels.atr_period = 10;
            config.risk.max_units = max_units;
            config.risk.stop_multiple = stop;
            config.risk.pyramid_step = step;
            config.risk.leverage = leverage;
            config.rules.allow_short = allow_short;
            config
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Counting units from each entry never exceeds the cap.
    #[test]
    fn units_never_exceed_cap(bars in arb_bars(), config in arb_config()) {
        let report = run_backtest(&bars, &config).unwrap();
        let mut units = 0;
        for trade in &report.trades {
            match trade.action {
                TradeAction::Entry => units = 1,
                TradeAction::Add => units += 1,
                TradeAction::Exit | TradeAction::Stop => units = 0,
            }
            prop_assert!(units <= config.risk.max_units);
        }
    }

    /// After every bar, an open position's stop is derived from its last unit.
    #[test]
    fn stop_tracks_most_recent_unit(bars in arb_bars(), config in arb_config()) {
        let frame = IndicatorFrame::compute(&bars, &config.channels);
        let mut machine = PositionStateMachine::new(config.clone());
        for (t, bar) in bars.iter().enumerate() {
            if let Some(row) = frame.row(t) {
                machine.on_bar(bar, &row);
            }
            if let Some(open) = machine.state().open() {
                let last = open.position.last_unit();
                let side = open.position.side();
                let expected = last.price - side.sign() * config.risk.stop_multiple * last.n_at_fill;
                prop_assert!((open.stop - expected).abs() < 1e-9);
                // strictly adverse
                prop_assert!(side.sign() * (last.price - open.stop) > 0.0);
                prop_assert!(open.position.unit_count() <= config.risk.max_units);
            }
        }
    }

    /// Two runs over the same input are indistinguishable.
    #[test]
    fn runs_are_deterministic(bars in arb_bars(), config in arb_config()) {
        let first = run_backtest(&bars, &config).unwrap();
        let second = run_backtest(&bars, &config).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Replaying the ledger from starting capital lands on the last sample.
    #[test]
    fn ledger_replay_matches_equity(bars in arb_bars(), config in arb_config()) {
        let report = run_backtest(&bars, &config).unwrap();
        let replay = replay_ledger(config.initial_capital, &report.trades);
        let close = bars.last().unwrap().close;
        let equity = report.equity_curve.last().unwrap().equity;
        prop_assert!((replay.equity_at(close) - equity).abs() < 1e-6 * config.initial_capital);
        prop_assert_eq!(report.equity_curve.len(), bars.len());
    }
}
