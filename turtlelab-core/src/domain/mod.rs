//! Domain types for TurtleLab.

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::{validate_series, Bar};
pub use position::{Position, Unit};
pub use trade::{EquitySample, TradeAction, TradeRecord};

use serde::{Deserialize, Serialize};

/// Direction of a position or of a fill that belongs to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
