//! Ledger and equity records produced by a run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Side;

/// What a ledger record did to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Entry,
    Add,
    Exit,
    Stop,
}

impl TradeAction {
    /// Entries and adds increase exposure; exits and stops flatten it.
    pub fn increases_exposure(self) -> bool {
        matches!(self, TradeAction::Entry | TradeAction::Add)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeAction::Entry => "entry",
            TradeAction::Add => "add",
            TradeAction::Exit => "exit",
            TradeAction::Stop => "stop",
        }
    }
}

/// One executed fill in the append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: NaiveDateTime,
    pub side: Side,
    pub action: TradeAction,
    /// Executed price.
    pub price: f64,
    pub quantity: f64,
    pub fee: f64,
    /// Slippage cost in quote currency (per-unit adjustment times quantity).
    pub slippage: f64,
    pub annotation: String,
}

/// Mark-to-market equity at a bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySample {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn trade_record_serializes_lowercase_enums() {
        let record = TradeRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(4, 0, 0)
                .unwrap(),
            side: Side::Short,
            action: TradeAction::Stop,
            price: 101.5,
            quantity: 3.0,
            fee: 0.12,
            slippage: 0.0,
            annotation: "2N stop".into(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"side\":\"short\""));
        assert!(json.contains("\"action\":\"stop\""));
        let back: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn exposure_direction_of_actions() {
        assert!(TradeAction::Entry.increases_exposure());
        assert!(TradeAction::Add.increases_exposure());
        assert!(!TradeAction::Exit.increases_exposure());
        assert!(!TradeAction::Stop.increases_exposure());
    }
}
