//! Strategy configuration and up-front validation.
//!
//! Every section is `#[serde(default)]`, so a TOML or JSON document only has
//! to name the fields it changes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Lookback lengths for the volatility unit and the four channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Shorter breakout lookback (classic 20).
    pub entry_fast_len: usize,
    /// Longer breakout lookback (classic 55).
    pub entry_slow_len: usize,
    /// Lowest-low lookback that closes longs.
    pub exit_long_len: usize,
    /// Highest-high lookback that closes shorts.
    pub exit_short_len: usize,
    /// Wilder ATR period for N.
    pub atr_period: usize,
    /// Build every channel from bars strictly before the current one.
    pub exclude_current_bar: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            entry_fast_len: 20,
            entry_slow_len: 55,
            exit_long_len: 10,
            exit_short_len: 20,
            atr_period: 20,
            exclude_current_bar: true,
        }
    }
}

/// Stop distance, pyramiding and sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Stop distance in multiples of N from the most recent unit.
    pub stop_multiple: f64,
    /// Ladder spacing in multiples of N from the first unit.
    pub pyramid_step: f64,
    /// Units per position, the initial entry included.
    pub max_units: usize,
    /// Equity risked per unit, in percent.
    pub risk_pct: f64,
    /// Total notional may not exceed equity times this.
    pub leverage: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_multiple: 2.0,
            pyramid_step: 0.5,
            max_units: 4,
            risk_pct: 1.0,
            leverage: 1.0,
        }
    }
}

/// Fee schedule and slippage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Fee rate for liquidity-taking fills, as a fraction of notional.
    pub taker_fee: f64,
    /// Fee rate for liquidity-providing fills.
    pub maker_fee: f64,
    /// Adverse price adjustment in basis points.
    pub slippage_bps: f64,
    /// Also slip exits and stops (entries and adds always slip).
    pub slip_exits: bool,
    /// Charge pyramid adds at the maker rate.
    pub adds_as_maker: bool,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            taker_fee: 0.0004,
            maker_fee: 0.0002,
            slippage_bps: 1.0,
            slip_exits: false,
            adds_as_maker: false,
        }
    }
}

/// Exchange lot filters. Zero disables a filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeFilters {
    pub step_size: f64,
    pub min_qty: f64,
    pub min_notional: f64,
}

/// Which entries are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub allow_short: bool,
    /// Skip a fast breakout when the last fast-breakout trade in that
    /// direction was a winner.
    pub skip_after_win: bool,
    pub enable_fast_breakout: bool,
    pub enable_slow_breakout: bool,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            allow_short: true,
            skip_after_win: true,
            enable_fast_breakout: true,
            enable_slow_breakout: true,
        }
    }
}

/// Complete configuration of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurtleConfig {
    pub channels: ChannelConfig,
    pub risk: RiskConfig,
    pub costs: CostConfig,
    pub exchange: ExchangeFilters,
    pub rules: RuleConfig,
    pub initial_capital: f64,
    /// Bars per year, used to annualize Sharpe and Sortino.
    pub periods_per_year: f64,
}

impl Default for TurtleConfig {
    fn default() -> Self {
        Self {
            channels: ChannelConfig::default(),
            risk: RiskConfig::default(),
            costs: CostConfig::default(),
            exchange: ExchangeFilters::default(),
            rules: RuleConfig::default(),
            initial_capital: 100_000.0,
            periods_per_year: 365.0,
        }
    }
}

impl TurtleConfig {
    /// Defaults with fees and slippage switched off.
    pub fn frictionless() -> Self {
        Self {
            costs: CostConfig {
                taker_fee: 0.0,
                maker_fee: 0.0,
                slippage_bps: 0.0,
                ..CostConfig::default()
            },
            ..Self::default()
        }
    }

    /// Reject configurations the engine cannot simulate meaningfully.
    ///
    /// `max_units = 0` passes: it yields a run without trades.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.channels;
        require_len("channels.entry_fast_len", c.entry_fast_len)?;
        require_len("channels.entry_slow_len", c.entry_slow_len)?;
        require_len("channels.exit_long_len", c.exit_long_len)?;
        require_len("channels.exit_short_len", c.exit_short_len)?;
        require_len("channels.atr_period", c.atr_period)?;

        let r = &self.risk;
        require_positive("risk.stop_multiple", r.stop_multiple)?;
        require_positive("risk.pyramid_step", r.pyramid_step)?;
        require_positive("risk.risk_pct", r.risk_pct)?;
        require_positive("risk.leverage", r.leverage)?;

        let k = &self.costs;
        require_non_negative("costs.taker_fee", k.taker_fee)?;
        require_non_negative("costs.maker_fee", k.maker_fee)?;
        require_non_negative("costs.slippage_bps", k.slippage_bps)?;

        let x = &self.exchange;
        require_non_negative("exchange.step_size", x.step_size)?;
        require_non_negative("exchange.min_qty", x.min_qty)?;
        require_non_negative("exchange.min_notional", x.min_notional)?;

        require_positive("initial_capital", self.initial_capital)?;
        require_positive("periods_per_year", self.periods_per_year)?;
        Ok(())
    }
}

fn require_len(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroLength { field });
    }
    Ok(())
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}
