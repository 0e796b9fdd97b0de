//! Indicator Engine.
//!
//! Indicators are pure functions: bar history in, numeric series of the same
//! length out, `f64::NAN` where a value is not yet defined. They are computed
//! once before the bar loop and read per bar through [`IndicatorFrame`].
//!
//! # Look-ahead guard
//! No value at bar t may depend on bar t+1 or later. With
//! `exclude_current_bar`, channel values at t do not depend on bar t either.

pub mod atr;
pub mod donchian;
pub mod frame;

pub use atr::{true_range, wilder_smooth, Atr};
pub use donchian::{Donchian, DonchianBand};
pub use frame::{IndicatorFrame, IndicatorRow};

use crate::domain::Bar;

/// A single-series indicator.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_20", "donchian_upper_55_lag").
    fn name(&self) -> &str;

    /// Number of leading bars whose value is undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Synthetic bars from closes: open = previous close, high/low one point
/// outside the body.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            timestamp: base + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
