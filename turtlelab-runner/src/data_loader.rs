//! Bar loading for the runner.
//!
//! Two sources:
//! 1. CSV with header `timestamp,open,high,low,close,volume`
//! 2. A seeded synthetic random walk (demos and tests)
//!
//! Timestamps end up timezone-naive in UTC. Numeric timestamps are epoch
//! milliseconds when their median magnitude is at least 1e12, otherwise
//! epoch seconds. Rows are sorted ascending; duplicates are kept so the
//! engine's series validation can reject them.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use turtlelab_core::domain::Bar;

use crate::config::DataSource;

/// Median magnitude at or above which numeric timestamps are milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Bar spacing of the synthetic series.
const SYNTHETIC_BAR_HOURS: i64 = 4;

/// Synthetic drift regime length in bars.
const SYNTHETIC_REGIME_BARS: usize = 120;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("row {row}: unrecognized timestamp '{value}'")]
    Timestamp { row: usize, value: String },

    #[error("no bars loaded")]
    Empty,
}

/// Loaded bars plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    /// BLAKE3 over every timestamp and OHLCV value.
    pub dataset_hash: String,
    pub synthetic: bool,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load bars from the configured source.
pub fn load(source: &DataSource) -> Result<LoadedData, LoadError> {
    let (bars, synthetic) = match source {
        DataSource::Csv { path } => (load_csv(path)?, false),
        DataSource::Synthetic { bars, seed } => {
            warn!(bars, seed, "generating synthetic data, results are tagged as synthetic");
            (synthetic_bars(*bars, *seed), true)
        }
    };
    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    let dataset_hash = dataset_hash(&bars);
    info!(
        bars = bars.len(),
        first = %bars[0].timestamp,
        last = %bars[bars.len() - 1].timestamp,
        dataset_hash = %dataset_hash,
        "bars loaded"
    );
    Ok(LoadedData {
        bars,
        dataset_hash,
        synthetic,
    })
}

pub fn load_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Open {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    read_bars(file)
}

/// Parse CSV bars from any reader and sort them by time.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for (i, record) in rdr.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let row = record.map_err(|source| LoadError::Row { row: i + 2, source })?;
        rows.push(row);
    }

    let raw: Vec<&str> = rows.iter().map(|r| r.timestamp.as_str()).collect();
    let timestamps = parse_timestamps(&raw)?;

    let mut bars: Vec<Bar> = rows
        .iter()
        .zip(timestamps)
        .map(|(r, timestamp)| Bar {
            timestamp,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
        })
        .collect();

    let out_of_order = bars
        .windows(2)
        .filter(|w| w[1].timestamp < w[0].timestamp)
        .count();
    if out_of_order > 0 {
        warn!(out_of_order, "CSV rows not in time order, sorting");
    }
    // stable: duplicates keep file order
    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

/// Normalize a column of raw timestamps.
///
/// If every value is numeric the whole column is epoch-based, with the unit
/// picked from the median magnitude; otherwise each value is parsed as a
/// date/time string.
pub fn parse_timestamps(raw: &[&str]) -> Result<Vec<NaiveDateTime>, LoadError> {
    let numeric: Option<Vec<f64>> = raw.iter().map(|s| s.parse::<f64>().ok()).collect();
    match numeric {
        Some(values) if !values.is_empty() => {
            let millis = median_abs(&values) >= MILLIS_THRESHOLD;
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    from_epoch(v, millis).ok_or_else(|| LoadError::Timestamp {
                        row: i + 2,
                        value: raw[i].to_string(),
                    })
                })
                .collect()
        }
        _ => raw
            .iter()
            .enumerate()
            .map(|(i, s)| {
                parse_datetime(s).ok_or_else(|| LoadError::Timestamp {
                    row: i + 2,
                    value: s.to_string(),
                })
            })
            .collect(),
    }
}

fn from_epoch(value: f64, millis: bool) -> Option<NaiveDateTime> {
    if !value.is_finite() {
        return None;
    }
    let millis = if millis { value } else { value * 1_000.0 };
    DateTime::from_timestamp_millis(millis.round() as i64).map(|dt| dt.naive_utc())
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn median_abs(values: &[f64]) -> f64 {
    let mut abs: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    abs.sort_by(|a, b| a.total_cmp(b));
    let mid = abs.len() / 2;
    if abs.len() % 2 == 0 {
        (abs[mid - 1] + abs[mid]) / 2.0
    } else {
        abs[mid]
    }
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp_millis().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Seeded random walk of 4-hour bars starting at 100.0.
///
/// The drift changes every few dozen bars so the series trends in both
/// directions. Same seed, same bars.
pub fn synthetic_bars(n: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0_f64;
    let mut drift = 0.0;
    for i in 0..n {
        if i % SYNTHETIC_REGIME_BARS == 0 {
            drift = rng.gen_range(-0.004..0.004);
        }
        let ret: f64 = drift + rng.gen_range(-0.02..0.02);
        let open = price;
        let close = (price * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        bars.push(Bar {
            timestamp: start + Duration::hours(SYNTHETIC_BAR_HOURS * i as i64),
            open,
            high,
            low,
            close,
            volume: rng.gen_range(500.0..5_000.0),
        });
        price = close;
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn epoch_seconds_and_millis() {
        let secs = parse_timestamps(&["1704067200", "1704081600"]).unwrap();
        assert_eq!(secs[0], ts("2024-01-01 00:00:00"));
        assert_eq!(secs[1], ts("2024-01-01 04:00:00"));

        let millis = parse_timestamps(&["1704067200000", "1704081600000"]).unwrap();
        assert_eq!(millis, secs);
    }

    #[test]
    fn string_formats() {
        let parsed = parse_timestamps(&[
            "2024-01-01T08:00:00+08:00",
            "2024-01-01 01:00:00",
            "2024-01-01T02:00:00",
            "2024-01-02",
        ])
        .unwrap();
        assert_eq!(parsed[0], ts("2024-01-01 00:00:00"));
        assert_eq!(parsed[1], ts("2024-01-01 01:00:00"));
        assert_eq!(parsed[2], ts("2024-01-01 02:00:00"));
        assert_eq!(parsed[3], ts("2024-01-02 00:00:00"));
    }

    #[test]
    fn garbage_timestamp_reports_row() {
        let err = parse_timestamps(&["2024-01-01", "yesterday"]).unwrap_err();
        assert!(matches!(err, LoadError::Timestamp { row: 3, .. }));
    }

    #[test]
    fn rows_are_sorted_and_duplicates_kept() {
        let csv = "timestamp,open,high,low,close,volume\n\
                   2024-01-03,3,3,3,3,1\n\
                   2024-01-01,1,1,1,1,1\n\
                   2024-01-01,2,2,2,2,1\n";
        let bars = read_bars(csv.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].open, 1.0);
        assert_eq!(bars[1].open, 2.0);
        assert_eq!(bars[2].open, 3.0);
        assert_eq!(bars[0].timestamp, bars[1].timestamp);
    }

    #[test]
    fn bad_number_is_a_row_error() {
        let csv = "timestamp,open,high,low,close,volume\n2024-01-01,x,1,1,1,1\n";
        assert!(matches!(
            read_bars(csv.as_bytes()).unwrap_err(),
            LoadError::Row { row: 2, .. }
        ));
    }

    #[test]
    fn synthetic_is_seeded() {
        let a = synthetic_bars(300, 7);
        let b = synthetic_bars(300, 7);
        let c = synthetic_bars(300, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|bar| bar.is_sane()));
        assert!(a.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn dataset_hash_tracks_content() {
        let bars = synthetic_bars(50, 1);
        let mut changed = bars.clone();
        changed[10].close += 0.01;
        assert_eq!(dataset_hash(&bars), dataset_hash(&bars.clone()));
        assert_ne!(dataset_hash(&bars), dataset_hash(&changed));
    }

    #[test]
    fn empty_synthetic_source_is_an_error() {
        let err = load(&DataSource::Synthetic { bars: 0, seed: 1 }).unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }
}
