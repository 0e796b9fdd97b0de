//! Run configuration: where the bars come from, where artifacts go, and the
//! strategy parameters handed to the engine.
//!
//! ```toml
//! [run]
//! symbol = "SOL/USDT"
//! csv = "data/sol_4h.csv"
//! output_dir = "output"
//!
//! [strategy.risk]
//! leverage = 3.0
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use turtlelab_core::TurtleConfig;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid strategy: {0}")]
    Strategy(#[from] turtlelab_core::ConfigError),

    #[error("no data source: set run.csv or run.synthetic_bars")]
    NoDataSource,
}

/// Where the bar series comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    Csv { path: PathBuf },
    Synthetic { bars: usize, seed: u64 },
}

/// The `[run]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    /// Label only; the engine trades a single instrument.
    pub symbol: String,
    /// CSV bar file; takes precedence over `synthetic_bars`.
    pub csv: Option<PathBuf>,
    pub synthetic_bars: Option<usize>,
    pub seed: u64,
    pub output_dir: PathBuf,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            symbol: "SOL/USDT".into(),
            csv: None,
            synthetic_bars: None,
            seed: 42,
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub strategy: TurtleConfig,
}

impl RunConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.strategy.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn data_source(&self) -> Result<DataSource, ConfigError> {
        match (&self.run.csv, self.run.synthetic_bars) {
            (Some(path), _) => Ok(DataSource::Csv { path: path.clone() }),
            (None, Some(bars)) => Ok(DataSource::Synthetic {
                bars,
                seed: self.run.seed,
            }),
            (None, None) => Err(ConfigError::NoDataSource),
        }
    }

    /// BLAKE3 of the canonical JSON form. Identical configs share an id.
    pub fn run_id(&self) -> Result<RunId, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}
