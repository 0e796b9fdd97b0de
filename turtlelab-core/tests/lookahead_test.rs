//! Look-ahead contamination tests for the indicator engine.
//!
//! Invariant: no indicator value at bar t may depend on bar t+1 or later, and
//! with `exclude_current_bar` the channels at t may not depend on bar t
//! itself either.
//!
//! Method: compute on a truncated series and on the full series and assert
//! the shared prefix is identical.

use chrono::NaiveDate;
use turtlelab_core::config::{ChannelConfig, TurtleConfig};
use turtlelab_core::domain::{Bar, TradeAction};
use turtlelab_core::indicators::{Atr, Donchian, Indicator, IndicatorFrame};
use turtlelab_core::run_backtest;

/// Deterministic pseudo-random walk.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut price = 100.0;
    (0..n)
        .map(|i| {
            let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
            let change = ((seed % 200) as f64 - 100.0) * 0.05;
            let open = price;
            price = (price + change).max(10.0);
            let close = price;
            Bar {
                timestamp: base + chrono::Duration::hours(4 * i as i64),
                open,
                high: open.max(close) + 1.5,
                low: open.min(close) - 1.5,
                close,
                volume: 1_000.0 + i as f64,
            }
        })
        .collect()
}

fn assert_no_lookahead(indicator: &dyn Indicator, full: &[Bar], truncated_len: usize) {
    let full_result = indicator.compute(full);
    let truncated_result = indicator.compute(&full[..truncated_len]);
    assert_eq!(truncated_result.len(), truncated_len);

    for i in 0..truncated_len {
        let (t, f) = (truncated_result[i], full_result[i]);
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert_eq!(t, f, "{}: mismatch at bar {i}", indicator.name());
    }
}

#[test]
fn indicators_do_not_look_ahead() {
    let bars = make_test_bars(300);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Atr::new(20)),
        Box::new(Donchian::upper(20)),
        Box::new(Donchian::lower(20)),
        Box::new(Donchian::upper(55).excluding_current(false)),
        Box::new(Donchian::lower(10).excluding_current(false)),
    ];
    for indicator in &indicators {
        for cut in [30, 100, 299] {
            assert_no_lookahead(indicator.as_ref(), &bars, cut);
        }
    }
}

#[test]
fn lagged_channels_ignore_the_current_bar() {
    let bars = make_test_bars(120);
    let channels = ChannelConfig::default();
    let reference = IndicatorFrame::compute(&bars, &channels);

    for t in [60, 80, 119] {
        let mut altered = bars[..=t].to_vec();
        altered[t].high = 10_000.0;
        altered[t].low = 0.01;
        let frame = IndicatorFrame::compute(&altered, &channels);
        let (a, b) = (frame.row(t).unwrap(), reference.row(t).unwrap());
        assert_eq!(a.entry_high_fast, b.entry_high_fast);
        assert_eq!(a.entry_low_fast, b.entry_low_fast);
        assert_eq!(a.entry_high_slow, b.entry_high_slow);
        assert_eq!(a.entry_low_slow, b.entry_low_slow);
        assert_eq!(a.exit_low, b.exit_low);
        assert_eq!(a.exit_high, b.exit_high);
    }
}

#[test]
fn spike_bar_does_not_fire_on_its_own_high() {
    let mut bars = make_test_bars(150);
    let t = 120;
    // huge intrabar spike, close back inside the prior channel
    let frame = IndicatorFrame::compute(&bars, &ChannelConfig::default());
    let row = frame.row(t).unwrap();
    bars[t].close = (row.entry_high_fast + row.entry_low_fast) / 2.0;
    bars[t].open = bars[t].close;
    bars[t].high = row.entry_high_fast * 10.0;
    bars[t].low = bars[t].close - 0.5;

    let mut config = TurtleConfig::frictionless();
    config.rules.allow_short = false;
    let report = run_backtest(&bars, &config).unwrap();
    assert!(report
        .trades
        .iter()
        .all(|tr| tr.timestamp != bars[t].timestamp || tr.action != TradeAction::Entry));

    // the spike is visible from the next bar on
    let after = IndicatorFrame::compute(&bars, &ChannelConfig::default());
    assert_eq!(after.row(t + 1).unwrap().entry_high_fast, bars[t].high);
}

#[test]
fn unlagged_breakout_can_never_fire() {
    // close is always inside its own bar's range
    let bars = make_test_bars(400);
    let mut config = TurtleConfig::frictionless();
    config.channels.exclude_current_bar = false;
    let report = run_backtest(&bars, &config).unwrap();
    assert!(report.trades.is_empty());
}
