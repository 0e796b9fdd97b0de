//! Round-trip reconstruction from the fill ledger.
//!
//! An entry opens a round trip, adds extend it, and the next exit or stop
//! closes it. Entry price is the volume-weighted average of all opening
//! fills; net P&L subtracts every fee paid along the way.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Side, TradeAction, TradeRecord};

/// One closed position, from first entry to exit or stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub side: Side,
    /// Annotation of the entry fill, naming the breakout that opened it.
    pub entry_signal: String,
    pub opened_at: NaiveDateTime,
    pub closed_at: NaiveDateTime,
    pub units: usize,
    pub quantity: f64,
    pub average_entry: f64,
    pub exit_price: f64,
    pub exit_action: TradeAction,
    pub gross_pnl: f64,
    pub fees: f64,
    pub net_pnl: f64,
}

impl RoundTrip {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}

struct OpenTrip<'a> {
    entry: &'a TradeRecord,
    units: usize,
    quantity: f64,
    cost: f64,
    fees: f64,
}

/// Pair opening fills with the exit or stop that closes them.
///
/// A position still open at the end of the ledger is not reported.
pub fn reconstruct_round_trips(trades: &[TradeRecord]) -> Vec<RoundTrip> {
    let mut trips = Vec::new();
    let mut open: Option<OpenTrip<'_>> = None;

    for trade in trades {
        match trade.action {
            TradeAction::Entry => {
                open = Some(OpenTrip {
                    entry: trade,
                    units: 1,
                    quantity: trade.quantity,
                    cost: trade.price * trade.quantity,
                    fees: trade.fee,
                });
            }
            TradeAction::Add => {
                if let Some(trip) = open.as_mut() {
                    trip.units += 1;
                    trip.quantity += trade.quantity;
                    trip.cost += trade.price * trade.quantity;
                    trip.fees += trade.fee;
                }
            }
            TradeAction::Exit | TradeAction::Stop => {
                let Some(trip) = open.take() else {
                    continue;
                };
                let average_entry = if trip.quantity > 0.0 {
                    trip.cost / trip.quantity
                } else {
                    0.0
                };
                let side = trip.entry.side;
                let gross_pnl = side.sign() * (trade.price - average_entry) * trip.quantity;
                let fees = trip.fees + trade.fee;
                trips.push(RoundTrip {
                    side,
                    entry_signal: trip.entry.annotation.clone(),
                    opened_at: trip.entry.timestamp,
                    closed_at: trade.timestamp,
                    units: trip.units,
                    quantity: trip.quantity,
                    average_entry,
                    exit_price: trade.price,
                    exit_action: trade.action,
                    gross_pnl,
                    fees,
                    net_pnl: gross_pnl - fees,
                });
            }
        }
    }
    trips
}
