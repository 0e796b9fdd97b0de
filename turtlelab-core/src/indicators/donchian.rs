//! Donchian channel — highest high / lowest low over a trailing window.
//!
//! Window for bar t:
//! - including the current bar: `[t-period+1, t]`, lookback `period - 1`
//! - excluding it (lagged): `[t-period, t-1]`, lookback `period`
//!
//! The lagged form is what the breakout rules use, so `close[t] > upper[t]`
//! can never be satisfied by bar t's own high.

use super::Indicator;
use crate::domain::Bar;

/// Which side of the channel to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    exclude_current: bool,
    name: String,
}

impl Donchian {
    pub fn upper(period: usize) -> Self {
        Self::build(period, DonchianBand::Upper, false)
    }

    pub fn lower(period: usize) -> Self {
        Self::build(period, DonchianBand::Lower, false)
    }

    /// Shift the window one bar back so it ends at t-1.
    pub fn excluding_current(self, exclude: bool) -> Self {
        Self::build(self.period, self.band, exclude)
    }

    fn build(period: usize, band: DonchianBand, exclude_current: bool) -> Self {
        let band_name = match band {
            DonchianBand::Upper => "upper",
            DonchianBand::Lower => "lower",
        };
        let suffix = if exclude_current { "_lag" } else { "" };
        Self {
            period,
            band,
            exclude_current,
            name: format!("donchian_{band_name}_{period}{suffix}"),
        }
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        if self.exclude_current {
            self.period
        } else {
            self.period.saturating_sub(1)
        }
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut result = vec![f64::NAN; bars.len()];
        if self.period == 0 {
            return result;
        }

        for (t, slot) in result.iter_mut().enumerate() {
            // exclusive end of the window
            let end = if self.exclude_current { t } else { t + 1 };
            if end < self.period {
                continue;
            }
            let window = &bars[end - self.period..end];
            *slot = match self.band {
                DonchianBand::Upper => window
                    .iter()
                    .map(|b| b.high)
                    .fold(f64::NEG_INFINITY, f64::max),
                DonchianBand::Lower => window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min),
            };
        }
        result
    }
}
