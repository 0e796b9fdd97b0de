//! Entry signal book.
//!
//! Four signal kinds: two breakout rules times two directions. The set is
//! closed, so the rule/side/description lookup is a plain `match`.

use serde::{Deserialize, Serialize};

use crate::config::ChannelConfig;
use crate::domain::Side;
use crate::indicators::IndicatorRow;

/// Which breakout system opened a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutRule {
    /// Shorter lookback, subject to skip-after-win.
    Fast,
    /// Longer lookback, never gated.
    Slow,
}

impl BreakoutRule {
    pub fn as_str(self) -> &'static str {
        match self {
            BreakoutRule::Fast => "fast",
            BreakoutRule::Slow => "slow",
        }
    }

    pub fn lookback(self, channels: &ChannelConfig) -> usize {
        match self {
            BreakoutRule::Fast => channels.entry_fast_len,
            BreakoutRule::Slow => channels.entry_slow_len,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    FastLong,
    SlowLong,
    FastShort,
    SlowShort,
}

impl SignalKind {
    /// Candidates for one direction, in evaluation order.
    pub fn for_side(side: Side) -> [SignalKind; 2] {
        match side {
            Side::Long => [SignalKind::FastLong, SignalKind::SlowLong],
            Side::Short => [SignalKind::FastShort, SignalKind::SlowShort],
        }
    }

    pub fn side(self) -> Side {
        match self {
            SignalKind::FastLong | SignalKind::SlowLong => Side::Long,
            SignalKind::FastShort | SignalKind::SlowShort => Side::Short,
        }
    }

    pub fn rule(self) -> BreakoutRule {
        match self {
            SignalKind::FastLong | SignalKind::FastShort => BreakoutRule::Fast,
            SignalKind::SlowLong | SignalKind::SlowShort => BreakoutRule::Slow,
        }
    }

    /// Channel level the close must strictly cross.
    pub fn level(self, row: &IndicatorRow) -> f64 {
        match self {
            SignalKind::FastLong => row.entry_high_fast,
            SignalKind::SlowLong => row.entry_high_slow,
            SignalKind::FastShort => row.entry_low_fast,
            SignalKind::SlowShort => row.entry_low_slow,
        }
    }

    pub fn fires(self, close: f64, row: &IndicatorRow) -> bool {
        let level = self.level(row);
        match self.side() {
            Side::Long => close > level,
            Side::Short => close < level,
        }
    }

    /// Ledger annotation, e.g. `"20-bar breakout"` or `"55-bar breakdown"`.
    pub fn describe(self, channels: &ChannelConfig) -> String {
        let verb = match self.side() {
            Side::Long => "breakout",
            Side::Short => "breakdown",
        };
        format!("{}-bar {}", self.rule().lookback(channels), verb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> IndicatorRow {
        IndicatorRow {
            n: 1.0,
            entry_high_fast: 105.0,
            entry_low_fast: 95.0,
            entry_high_slow: 110.0,
            entry_low_slow: 90.0,
            exit_low: 97.0,
            exit_high: 103.0,
        }
    }

    #[test]
    fn breakout_is_strict() {
        let r = row();
        assert!(!SignalKind::FastLong.fires(105.0, &r));
        assert!(SignalKind::FastLong.fires(105.01, &r));
        assert!(!SignalKind::SlowLong.fires(105.01, &r));
        assert!(SignalKind::FastShort.fires(94.0, &r));
        assert!(!SignalKind::SlowShort.fires(90.0, &r));
    }

    #[test]
    fn kinds_map_to_side_and_rule() {
        for side in [Side::Long, Side::Short] {
            let [fast, slow] = SignalKind::for_side(side);
            assert_eq!(fast.side(), side);
            assert_eq!(slow.side(), side);
            assert_eq!(fast.rule(), BreakoutRule::Fast);
            assert_eq!(slow.rule(), BreakoutRule::Slow);
        }
    }

    #[test]
    fn descriptions_use_configured_lookbacks() {
        let channels = ChannelConfig::default();
        assert_eq!(SignalKind::FastLong.describe(&channels), "20-bar breakout");
        assert_eq!(SignalKind::SlowShort.describe(&channels), "55-bar breakdown");
    }
}
