//! Bar — the fundamental market data unit.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// OHLCV bar at a timezone-naive timestamp.
///
/// Volume is fractional because crypto venues report base-asset volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// True when every price and the volume are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }

    /// Basic OHLC sanity: high bounds the bar from above, low from below.
    pub fn is_sane(&self) -> bool {
        self.is_finite()
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Check that a series is strictly ascending in time and fully finite.
///
/// The first offending bar is reported; nothing is repaired.
pub fn validate_series(bars: &[Bar]) -> Result<(), DataError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_finite() {
            return Err(DataError::NonFinite {
                index,
                timestamp: bar.timestamp,
            });
        }
        if index == 0 {
            continue;
        }
        let previous = bars[index - 1].timestamp;
        if bar.timestamp == previous {
            return Err(DataError::DuplicateTimestamp {
                index,
                timestamp: bar.timestamp,
            });
        }
        if bar.timestamp < previous {
            return Err(DataError::NonAscending {
                index,
                timestamp: bar.timestamp,
                previous,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sample_bar(day: u32) -> Bar {
        Bar {
            timestamp: ts(day),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 1_250.5,
        }
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar(2).is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar(2);
        bar.high = 97.0;
        assert!(!bar.is_sane());
    }

    #[test]
    fn ascending_series_is_valid() {
        let bars: Vec<Bar> = (2..8).map(sample_bar).collect();
        assert_eq!(validate_series(&bars), Ok(()));
        assert_eq!(validate_series(&[]), Ok(()));
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let bars = vec![sample_bar(2), sample_bar(3), sample_bar(3)];
        assert_eq!(
            validate_series(&bars),
            Err(DataError::DuplicateTimestamp {
                index: 2,
                timestamp: ts(3)
            })
        );
    }

    #[test]
    fn descending_timestamp_is_rejected() {
        let mut bars = vec![sample_bar(2), sample_bar(5)];
        bars.push(Bar {
            timestamp: ts(5) - Duration::hours(4),
            ..sample_bar(5)
        });
        assert!(matches!(
            validate_series(&bars),
            Err(DataError::NonAscending { index: 2, .. })
        ));
    }

    #[test]
    fn nan_price_is_rejected() {
        let mut bars = vec![sample_bar(2), sample_bar(3)];
        bars[1].close = f64::NAN;
        assert!(matches!(
            validate_series(&bars),
            Err(DataError::NonFinite { index: 1, .. })
        ));
    }

    #[test]
    fn infinite_volume_is_rejected() {
        let mut bars = vec![sample_bar(2)];
        bars[0].volume = f64::INFINITY;
        assert!(validate_series(&bars).is_err());
    }
}
