//! Average True Range — the volatility unit N.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! N[t] = N[t-1] + (TR[t] - N[t-1]) / period, seeded with the mean of the
//! first `period` true ranges. Bar 0 has no previous close, so the first
//! `period` bars carry no N.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range per bar. Bar 0 is `NAN` because it has no previous close.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = vec![f64::NAN; bars.len()];
    for (i, pair) in bars.windows(2).enumerate() {
        let (prev, bar) = (&pair[0], &pair[1]);
        tr[i + 1] = (bar.high - bar.low)
            .max((bar.high - prev.close).abs())
            .max((bar.low - prev.close).abs());
    }
    tr
}

/// Wilder smoothing (alpha = 1/period).
///
/// The seed is the mean of the first run of `period` consecutive finite
/// values; a non-finite value after the seed ends the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }

    let mut run = 0;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_finite() {
            run += 1;
            if run == period {
                seed_end = Some(i);
                break;
            }
        } else {
            run = 0;
        }
    }
    let Some(end) = seed_end else {
        return out;
    };

    let mut prev = values[end + 1 - period..=end].iter().sum::<f64>() / period as f64;
    out[end] = prev;
    for i in end + 1..values.len() {
        let v = values[i];
        if !v.is_finite() {
            break;
        }
        prev += (v - prev) / period as f64;
        out[i] = prev;
    }
    out
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        wilder_smooth(&true_range(bars), self.period)
    }
}
