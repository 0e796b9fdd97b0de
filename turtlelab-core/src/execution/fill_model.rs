//! Slippage, maker/taker fees and exchange quantity filters.
//!
//! Slippage is adverse and fixed in basis points. Fills that increase
//! exposure always slip: a long entry pays more, a short entry receives less.
//! Exits and stops fill at their trigger price unless `slip_exits` is set.
//!
//! Quantity filters (step rounding, minimum quantity, minimum notional) apply
//! only to fills that increase exposure. Closing a held position is never
//! rejected.
//!
//! The fill model knows nothing about equity; the leverage ceiling is the
//! caller's job.

use serde::{Deserialize, Serialize};

use crate::config::{CostConfig, ExchangeFilters};
use crate::domain::{Side, TradeAction};

/// Tolerance for float noise when dividing by the step size.
const STEP_EPSILON: f64 = 1e-9;

/// Fee tier of a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liquidity {
    Taker,
    Maker,
}

/// An executed fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
    pub fee: f64,
    /// Slippage cost in quote currency.
    pub slippage: f64,
}

/// Why a desired trade produced no fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectReason {
    /// Zero, negative or non-finite quantity after step rounding.
    NonPositiveQuantity { quantity: f64 },
    BelowMinQuantity { quantity: f64, min_qty: f64 },
    BelowMinNotional { notional: f64, min_notional: f64 },
}

/// Result of [`FillModel::fill`]. A rejection is a no-op for the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillOutcome {
    Filled(Fill),
    Rejected(RejectReason),
}

impl FillOutcome {
    pub fn filled(self) -> Option<Fill> {
        match self {
            FillOutcome::Filled(fill) => Some(fill),
            FillOutcome::Rejected(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillModel {
    taker_fee: f64,
    maker_fee: f64,
    slippage_bps: f64,
    slip_exits: bool,
    step_size: f64,
    min_qty: f64,
    min_notional: f64,
}

impl FillModel {
    pub fn new(costs: &CostConfig, exchange: &ExchangeFilters) -> Self {
        Self {
            taker_fee: costs.taker_fee,
            maker_fee: costs.maker_fee,
            slippage_bps: costs.slippage_bps,
            slip_exits: costs.slip_exits,
            step_size: exchange.step_size,
            min_qty: exchange.min_qty,
            min_notional: exchange.min_notional,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(
            &CostConfig {
                taker_fee: 0.0,
                maker_fee: 0.0,
                slippage_bps: 0.0,
                slip_exits: false,
                adds_as_maker: false,
            },
            &ExchangeFilters::default(),
        )
    }

    pub fn fee_rate(&self, liquidity: Liquidity) -> f64 {
        match liquidity {
            Liquidity::Taker => self.taker_fee,
            Liquidity::Maker => self.maker_fee,
        }
    }

    /// Round down to the step size, then enforce min quantity and min
    /// notional at `price`.
    pub fn filter_quantity(&self, quantity: f64, price: f64) -> Result<f64, RejectReason> {
        let rounded = if self.step_size > 0.0 {
            (quantity / self.step_size + STEP_EPSILON).floor() * self.step_size
        } else {
            quantity
        };
        if !(rounded.is_finite() && rounded > 0.0) {
            return Err(RejectReason::NonPositiveQuantity { quantity: rounded });
        }
        if self.min_qty > 0.0 && rounded < self.min_qty {
            return Err(RejectReason::BelowMinQuantity {
                quantity: rounded,
                min_qty: self.min_qty,
            });
        }
        let notional = rounded * price;
        if self.min_notional > 0.0 && notional < self.min_notional {
            return Err(RejectReason::BelowMinNotional {
                notional,
                min_notional: self.min_notional,
            });
        }
        Ok(rounded)
    }

    /// Executed price after adverse slippage for this side and action.
    pub fn slipped_price(&self, side: Side, action: TradeAction, price: f64) -> f64 {
        let opening = action.increases_exposure();
        if self.slippage_bps == 0.0 || !(opening || self.slip_exits) {
            return price;
        }
        let fraction = self.slippage_bps / 10_000.0;
        // buying: long entries and short covers
        let buying = matches!(
            (side, opening),
            (Side::Long, true) | (Side::Short, false)
        );
        if buying {
            price * (1.0 + fraction)
        } else {
            price * (1.0 - fraction)
        }
    }

    /// Execute `quantity` at `price`.
    pub fn fill(
        &self,
        side: Side,
        action: TradeAction,
        price: f64,
        quantity: f64,
        liquidity: Liquidity,
    ) -> FillOutcome {
        let executed_price = self.slipped_price(side, action, price);
        let executed_qty = if action.increases_exposure() {
            match self.filter_quantity(quantity, executed_price) {
                Ok(q) => q,
                Err(reason) => return FillOutcome::Rejected(reason),
            }
        } else if quantity > 0.0 {
            quantity
        } else {
            return FillOutcome::Rejected(RejectReason::NonPositiveQuantity { quantity });
        };

        FillOutcome::Filled(Fill {
            price: executed_price,
            quantity: executed_qty,
            fee: executed_qty * executed_price * self.fee_rate(liquidity),
            slippage: (executed_price - price).abs() * executed_qty,
        })
    }
}
