//! Performance metrics — pure functions over the equity curve and ledger.
//!
//! Every metric is a pure function: equity samples and/or round trips in,
//! scalar out. Degenerate inputs (fewer than two samples, zero variance, no
//! losing trades) produce 0.0 or `None`, never a panic.

pub mod round_trip;

pub use round_trip::{reconstruct_round_trips, RoundTrip};

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{EquitySample, Side, TradeAction, TradeRecord};

const DAYS_PER_YEAR: f64 = 365.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Aggregate performance metrics for a single backtest run.
///
/// JSON has no encoding for non-finite floats: they serialize as `null` and
/// come back as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(deserialize_with = "null_as_nan")]
    pub total_return: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub cagr: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub sharpe: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub sortino: f64,
    /// Negative fraction, e.g. -0.15 for a 15% drawdown.
    #[serde(deserialize_with = "null_as_nan")]
    pub max_drawdown: f64,
    /// Closed round trips.
    pub trade_count: usize,
    #[serde(deserialize_with = "null_as_nan")]
    pub win_rate: f64,
    /// `None` when there are no losing round trips.
    pub profit_factor: Option<f64>,
    #[serde(deserialize_with = "null_as_nan")]
    pub gross_profit: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub gross_loss: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub final_equity: f64,
}

fn null_as_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl PerformanceMetrics {
    pub fn compute(
        equity_curve: &[EquitySample],
        round_trips: &[RoundTrip],
        periods_per_year: f64,
    ) -> Self {
        let values: Vec<f64> = equity_curve.iter().map(|s| s.equity).collect();
        let (gross_profit, gross_loss) = gross_profit_and_loss(round_trips);
        Self {
            total_return: total_return(&values),
            cagr: cagr(equity_curve),
            sharpe: sharpe_ratio(&values, periods_per_year),
            sortino: sortino_ratio(&values, periods_per_year),
            max_drawdown: max_drawdown(&values),
            trade_count: round_trips.len(),
            win_rate: win_rate(round_trips),
            profit_factor: profit_factor(round_trips),
            gross_profit,
            gross_loss,
            final_equity: values.last().copied().unwrap_or(0.0),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity: &[f64]) -> f64 {
    match (equity.first(), equity.last()) {
        (Some(&first), Some(&last)) if equity.len() >= 2 && first > 0.0 => {
            (last - first) / first
        }
        _ => 0.0,
    }
}

/// Compound annual growth rate over the calendar time between the first and
/// last sample (at least one day).
///
/// Returns -1.0 when the account is wiped out.
pub fn cagr(equity_curve: &[EquitySample]) -> f64 {
    let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    if equity_curve.len() < 2 || first.equity <= 0.0 {
        return 0.0;
    }
    if last.equity <= 0.0 {
        return -1.0;
    }
    let elapsed = (last.timestamp - first.timestamp).num_seconds() as f64 / SECONDS_PER_DAY;
    let years = elapsed.max(1.0) / DAYS_PER_YEAR;
    (last.equity / first.equity).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio of period returns (zero risk-free rate).
///
/// Returns 0.0 if variance is zero or there are fewer than two returns.
pub fn sharpe_ratio(equity: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / std * periods_per_year.sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
///
/// Returns 0.0 if there is no downside or fewer than two returns.
pub fn sortino_ratio(equity: &[f64], periods_per_year: f64) -> f64 {
    let returns = period_returns(equity);
    if returns.len() < 2 {
        return 0.0;
    }
    let downside_sq: f64 = returns.iter().filter(|&&r| r < 0.0).map(|r| r * r).sum();
    let downside_std = (downside_sq / returns.len() as f64).sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    mean_f64(&returns) / downside_std * periods_per_year.sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &eq in equity {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.min(eq / peak - 1.0);
        }
    }
    max_dd
}

/// Fraction of round trips with positive net P&L.
pub fn win_rate(round_trips: &[RoundTrip]) -> f64 {
    if round_trips.is_empty() {
        return 0.0;
    }
    let winners = round_trips.iter().filter(|t| t.is_winner()).count();
    winners as f64 / round_trips.len() as f64
}

/// Sum of winning net P&L and sum of absolute losing net P&L.
pub fn gross_profit_and_loss(round_trips: &[RoundTrip]) -> (f64, f64) {
    round_trips.iter().fold((0.0, 0.0), |(profit, loss), t| {
        if t.net_pnl > 0.0 {
            (profit + t.net_pnl, loss)
        } else {
            (profit, loss - t.net_pnl)
        }
    })
}

/// Gross profit / gross loss; `None` when nothing was lost.
pub fn profit_factor(round_trips: &[RoundTrip]) -> Option<f64> {
    let (profit, loss) = gross_profit_and_loss(round_trips);
    if loss > 0.0 {
        Some(profit / loss)
    } else {
        None
    }
}

// ─── Ledger replay ──────────────────────────────────────────────────

/// Account state rebuilt from nothing but the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerReplay {
    pub cash: f64,
    pub realized_pnl: f64,
    pub fees: f64,
    pub open_side: Option<Side>,
    pub open_quantity: f64,
    pub open_average_price: f64,
}

impl LedgerReplay {
    /// Equity with any open position marked at `close`.
    pub fn equity_at(&self, close: f64) -> f64 {
        let unrealized = self.open_side.map_or(0.0, |side| {
            side.sign() * (close - self.open_average_price) * self.open_quantity
        });
        self.cash + unrealized
    }
}

/// Replay the ledger against starting capital.
pub fn replay_ledger(initial_capital: f64, trades: &[TradeRecord]) -> LedgerReplay {
    let mut replay = LedgerReplay {
        cash: initial_capital,
        realized_pnl: 0.0,
        fees: 0.0,
        open_side: None,
        open_quantity: 0.0,
        open_average_price: 0.0,
    };
    let mut cost = 0.0;

    for trade in trades {
        replay.cash -= trade.fee;
        replay.fees += trade.fee;
        match trade.action {
            TradeAction::Entry | TradeAction::Add => {
                replay.open_side = Some(trade.side);
                replay.open_quantity += trade.quantity;
                cost += trade.price * trade.quantity;
                replay.open_average_price = cost / replay.open_quantity;
            }
            TradeAction::Exit | TradeAction::Stop => {
                let pnl = trade.side.sign()
                    * (trade.price - replay.open_average_price)
                    * replay.open_quantity;
                replay.cash += pnl;
                replay.realized_pnl += pnl;
                replay.open_side = None;
                replay.open_quantity = 0.0;
                replay.open_average_price = 0.0;
                cost = 0.0;
            }
        }
    }
    replay
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Period-over-period simple returns.
pub fn period_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
