use serde::{Deserialize, Serialize};

/// Realized cash balance and P&L counters.
///
/// Cash moves only on fees and on realized P&L when a position closes;
/// unrealized P&L is added on top when marking to market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    initial_capital: f64,
    cash: f64,
    realized_pnl: f64,
    fees_paid: f64,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            realized_pnl: 0.0,
            fees_paid: 0.0,
        }
    }

    pub fn pay_fee(&mut self, fee: f64) {
        self.cash -= fee;
        self.fees_paid += fee;
    }

    /// Book gross P&L of a closed position.
    pub fn realize(&mut self, pnl: f64) {
        self.cash += pnl;
        self.realized_pnl += pnl;
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    /// Realized equity: starting capital plus realized P&L minus fees.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn fees_paid(&self) -> f64 {
        self.fees_paid
    }

    /// Mark-to-market equity given the open position's unrealized P&L.
    pub fn equity(&self, unrealized_pnl: f64) -> f64 {
        self.cash + unrealized_pnl
    }
}
