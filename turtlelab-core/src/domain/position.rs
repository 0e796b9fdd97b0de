//! Position — an ordered stack of same-direction units.

use serde::{Deserialize, Serialize};

use super::Side;

/// One executed entry or pyramid fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    /// Executed price, slippage included.
    pub price: f64,
    /// Unsigned quantity; the direction lives on the owning [`Position`].
    pub quantity: f64,
    /// Volatility unit N at the bar the unit was filled.
    pub n_at_fill: f64,
}

/// An open position: one or more units, all in the same direction.
///
/// There are no partial exits, so a position only ever grows until it is
/// closed in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    side: Side,
    units: Vec<Unit>,
}

impl Position {
    pub fn new(side: Side, first: Unit) -> Self {
        Self {
            side,
            units: vec![first],
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn push(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    /// Entry price of the first unit; anchors the pyramid ladder.
    pub fn first_price(&self) -> f64 {
        self.units[0].price
    }

    /// Most recent unit; anchors the stop.
    pub fn last_unit(&self) -> &Unit {
        &self.units[self.units.len() - 1]
    }

    /// Total unsigned quantity.
    pub fn size(&self) -> f64 {
        self.units.iter().map(|u| u.quantity).sum()
    }

    /// Size-weighted mean of unit prices.
    pub fn average_price(&self) -> f64 {
        let size = self.size();
        if size == 0.0 {
            return 0.0;
        }
        self.units.iter().map(|u| u.price * u.quantity).sum::<f64>() / size
    }

    /// Unrealized P&L when marked at `price`.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.average_price()) * self.size()
    }

    /// Absolute notional at `price`.
    pub fn notional(&self, price: f64) -> f64 {
        self.size() * price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(price: f64, quantity: f64) -> Unit {
        Unit {
            price,
            quantity,
            n_at_fill: 2.0,
        }
    }

    #[test]
    fn average_price_is_size_weighted() {
        let mut pos = Position::new(Side::Long, unit(100.0, 10.0));
        pos.push(unit(110.0, 30.0));
        assert_eq!(pos.size(), 40.0);
        assert!((pos.average_price() - 107.5).abs() < 1e-12);
        assert_eq!(pos.first_price(), 100.0);
        assert_eq!(pos.last_unit().price, 110.0);
    }

    #[test]
    fn long_unrealized_pnl() {
        let pos = Position::new(Side::Long, unit(100.0, 10.0));
        assert!((pos.unrealized_pnl(105.0) - 50.0).abs() < 1e-12);
        assert!((pos.unrealized_pnl(95.0) + 50.0).abs() < 1e-12);
    }

    #[test]
    fn short_unrealized_pnl() {
        let pos = Position::new(Side::Short, unit(100.0, 10.0));
        assert!((pos.unrealized_pnl(95.0) - 50.0).abs() < 1e-12);
        assert!((pos.notional(95.0) - 950.0).abs() < 1e-12);
    }
}
