//! Per-direction outcome of the last fast-breakout trade.

use serde::{Deserialize, Serialize};

use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    /// Strictly positive P&L is a win; breakeven counts as a loss.
    pub fn from_pnl(pnl: f64) -> Self {
        if pnl > 0.0 {
            Outcome::Win
        } else {
            Outcome::Loss
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionalMemory {
    long: Option<Outcome>,
    short: Option<Outcome>,
}

impl DirectionalMemory {
    pub fn last(&self, side: Side) -> Option<Outcome> {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }

    pub fn record(&mut self, side: Side, outcome: Outcome) {
        match side {
            Side::Long => self.long = Some(outcome),
            Side::Short => self.short = Some(outcome),
        }
    }

    /// Whether a fast breakout in `side` may be taken.
    pub fn allows_fast_entry(&self, side: Side, skip_after_win: bool) -> bool {
        !skip_after_win || self.last(side) != Some(Outcome::Win)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_blocks_only_its_own_direction() {
        let mut memory = DirectionalMemory::default();
        assert!(memory.allows_fast_entry(Side::Long, true));
        memory.record(Side::Long, Outcome::Win);
        assert!(!memory.allows_fast_entry(Side::Long, true));
        assert!(memory.allows_fast_entry(Side::Short, true));
        assert!(memory.allows_fast_entry(Side::Long, false));
    }

    #[test]
    fn loss_reopens_the_gate() {
        let mut memory = DirectionalMemory::default();
        memory.record(Side::Short, Outcome::Win);
        memory.record(Side::Short, Outcome::Loss);
        assert!(memory.allows_fast_entry(Side::Short, true));
        assert_eq!(memory.last(Side::Short), Some(Outcome::Loss));
    }

    #[test]
    fn breakeven_is_a_loss() {
        assert_eq!(Outcome::from_pnl(0.0), Outcome::Loss);
        assert_eq!(Outcome::from_pnl(1e-9), Outcome::Win);
    }
}
