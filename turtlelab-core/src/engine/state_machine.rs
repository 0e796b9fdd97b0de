//! Position & risk state machine.
//!
//! One call to [`PositionStateMachine::on_bar`] per ready bar. The checks run
//! in a fixed order and the first one that trades ends the bar:
//!
//! 1. exit: close crossed the exit channel, fill at the channel level
//! 2. stop: the bar's range reached the stop, fill at the stop level
//! 3. add: the bar's range reached the next ladder level, fill at that level
//! 4. entry: from flat only, fill at the close
//!
//! A rejected fill is a no-op for the bar; nothing is retried.

use tracing::{debug, info};

use crate::config::TurtleConfig;
use crate::domain::{Bar, Position, Side, TradeAction, TradeRecord, Unit};
use crate::execution::{Fill, FillModel, FillOutcome, Liquidity};
use crate::indicators::IndicatorRow;

use super::accounting::Account;
use super::memory::{DirectionalMemory, Outcome};
use super::signals::{BreakoutRule, SignalKind};

/// Slack for float noise in the leverage ceiling.
const LEVERAGE_EPSILON: f64 = 1e-9;

/// Everything that exists only while a position is open.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub position: Position,
    /// Most recent unit's price moved against the position by
    /// `stop_multiple × N` at that fill. Replaced on every fill.
    pub stop: f64,
    /// Add levels `first_price ± k × pyramid_step × N`, k = 1..max_units.
    pub ladder: Vec<f64>,
    /// Rule that produced the entry unit.
    pub rule: BreakoutRule,
}

impl OpenPosition {
    /// Ladder level the next add waits for, if the position may still grow.
    pub fn next_add_level(&self) -> Option<f64> {
        self.ladder
            .get(self.position.unit_count().saturating_sub(1))
            .copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PositionState {
    #[default]
    Flat,
    Long(OpenPosition),
    Short(OpenPosition),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(_) => Some(Side::Long),
            PositionState::Short(_) => Some(Side::Short),
        }
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(open) | PositionState::Short(open) => Some(open),
        }
    }

    fn open_mut(&mut self) -> Option<&mut OpenPosition> {
        match self {
            PositionState::Flat => None,
            PositionState::Long(open) | PositionState::Short(open) => Some(open),
        }
    }

    fn take(&mut self) -> Option<OpenPosition> {
        match std::mem::take(self) {
            PositionState::Flat => None,
            PositionState::Long(open) | PositionState::Short(open) => Some(open),
        }
    }

    fn opened(open: OpenPosition) -> Self {
        match open.position.side() {
            Side::Long => PositionState::Long(open),
            Side::Short => PositionState::Short(open),
        }
    }
}

/// Owns the position, directional memory and realized account of one run.
#[derive(Debug, Clone)]
pub struct PositionStateMachine {
    config: TurtleConfig,
    fills: FillModel,
    state: PositionState,
    memory: DirectionalMemory,
    account: Account,
}

impl PositionStateMachine {
    pub fn new(config: TurtleConfig) -> Self {
        let fills = FillModel::new(&config.costs, &config.exchange);
        let account = Account::new(config.initial_capital);
        Self {
            config,
            fills,
            state: PositionState::Flat,
            memory: DirectionalMemory::default(),
            account,
        }
    }

    pub fn state(&self) -> &PositionState {
        &self.state
    }

    pub fn memory(&self) -> &DirectionalMemory {
        &self.memory
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Realized cash plus the open position's P&L at `close`.
    pub fn mark_to_market(&self, close: f64) -> f64 {
        let unrealized = self
            .state
            .open()
            .map_or(0.0, |open| open.position.unrealized_pnl(close));
        self.account.equity(unrealized)
    }

    /// Evaluate one ready bar. Returns the trade it produced, if any.
    pub fn on_bar(&mut self, bar: &Bar, row: &IndicatorRow) -> Option<TradeRecord> {
        if let Some(trade) = self.check_exit(bar, row) {
            return Some(trade);
        }
        if let Some(trade) = self.check_stop(bar) {
            return Some(trade);
        }
        if !self.state.is_flat() {
            return self.check_add(bar, row);
        }
        self.check_entry(bar, row)
    }

    fn check_exit(&mut self, bar: &Bar, row: &IndicatorRow) -> Option<TradeRecord> {
        let side = self.state.side()?;
        let (level, crossed) = match side {
            Side::Long => (row.exit_low, bar.close < row.exit_low),
            Side::Short => (row.exit_high, bar.close > row.exit_high),
        };
        if !crossed {
            return None;
        }
        self.close_position(bar, TradeAction::Exit, level, "channel exit".to_string())
    }

    fn check_stop(&mut self, bar: &Bar) -> Option<TradeRecord> {
        let open = self.state.open()?;
        let stop = open.stop;
        let hit = match open.position.side() {
            Side::Long => bar.low <= stop,
            Side::Short => bar.high >= stop,
        };
        if !hit {
            return None;
        }
        let annotation = format!("{}N stop", self.config.risk.stop_multiple);
        self.close_position(bar, TradeAction::Stop, stop, annotation)
    }

    fn check_add(&mut self, bar: &Bar, row: &IndicatorRow) -> Option<TradeRecord> {
        let open = self.state.open()?;
        let side = open.position.side();
        let units = open.position.unit_count();
        if units >= self.config.risk.max_units {
            return None;
        }
        let level = open.next_add_level()?;
        let reached = match side {
            Side::Long => bar.high >= level,
            Side::Short => bar.low <= level,
        };
        if !reached {
            return None;
        }

        let quantity = self.size_unit(row.n, bar.close)?;
        let liquidity = if self.config.costs.adds_as_maker {
            Liquidity::Maker
        } else {
            Liquidity::Taker
        };
        let fill = self.execute(side, TradeAction::Add, level, quantity, liquidity)?;

        self.account.pay_fee(fill.fee);
        let stop_multiple = self.config.risk.stop_multiple;
        let step = self.config.risk.pyramid_step;
        let max_units = self.config.risk.max_units;
        let open = self.state.open_mut()?;
        open.position.push(Unit {
            price: fill.price,
            quantity: fill.quantity,
            n_at_fill: row.n,
        });
        open.stop = stop_for(side, fill.price, row.n, stop_multiple);
        open.ladder = ladder_for(side, open.position.first_price(), row.n, step, max_units);

        debug!(
            timestamp = %bar.timestamp,
            side = %side,
            price = fill.price,
            quantity = fill.quantity,
            units = open.position.unit_count(),
            stop = open.stop,
            "pyramid add"
        );

        Some(TradeRecord {
            timestamp: bar.timestamp,
            side,
            action: TradeAction::Add,
            price: fill.price,
            quantity: fill.quantity,
            fee: fill.fee,
            slippage: fill.slippage,
            annotation: format!("unit {} @ {}N", units + 1, units as f64 * step),
        })
    }

    fn check_entry(&mut self, bar: &Bar, row: &IndicatorRow) -> Option<TradeRecord> {
        if self.config.risk.max_units == 0 {
            return None;
        }
        let sides: &[Side] = if self.config.rules.allow_short {
            &[Side::Long, Side::Short]
        } else {
            &[Side::Long]
        };
        let kind = sides
            .iter()
            .find_map(|&side| self.select_signal(side, bar, row))?;
        self.open_position(bar, row, kind)
    }

    /// First enabled signal for `side` that fires and passes the
    /// skip-after-win gate. A gated fast breakout falls through to the slow one.
    fn select_signal(&self, side: Side, bar: &Bar, row: &IndicatorRow) -> Option<SignalKind> {
        let rules = &self.config.rules;
        SignalKind::for_side(side).into_iter().find(|kind| {
            let enabled = match kind.rule() {
                BreakoutRule::Fast => rules.enable_fast_breakout,
                BreakoutRule::Slow => rules.enable_slow_breakout,
            };
            if !enabled || !kind.fires(bar.close, row) {
                return false;
            }
            if kind.rule() == BreakoutRule::Fast
                && !self.memory.allows_fast_entry(side, rules.skip_after_win)
            {
                debug!(timestamp = %bar.timestamp, side = %side, "fast breakout skipped after win");
                return false;
            }
            true
        })
    }

    fn open_position(
        &mut self,
        bar: &Bar,
        row: &IndicatorRow,
        kind: SignalKind,
    ) -> Option<TradeRecord> {
        let side = kind.side();
        let quantity = self.size_unit(row.n, bar.close)?;
        let fill = self.execute(side, TradeAction::Entry, bar.close, quantity, Liquidity::Taker)?;

        self.account.pay_fee(fill.fee);
        let risk = &self.config.risk;
        let open = OpenPosition {
            position: Position::new(
                side,
                Unit {
                    price: fill.price,
                    quantity: fill.quantity,
                    n_at_fill: row.n,
                },
            ),
            stop: stop_for(side, fill.price, row.n, risk.stop_multiple),
            ladder: ladder_for(side, fill.price, row.n, risk.pyramid_step, risk.max_units),
            rule: kind.rule(),
        };

        info!(
            timestamp = %bar.timestamp,
            side = %side,
            rule = kind.rule().as_str(),
            price = fill.price,
            quantity = fill.quantity,
            n = row.n,
            stop = open.stop,
            "entry"
        );
        self.state = PositionState::opened(open);

        Some(TradeRecord {
            timestamp: bar.timestamp,
            side,
            action: TradeAction::Entry,
            price: fill.price,
            quantity: fill.quantity,
            fee: fill.fee,
            slippage: fill.slippage,
            annotation: kind.describe(&self.config.channels),
        })
    }

    fn close_position(
        &mut self,
        bar: &Bar,
        action: TradeAction,
        price: f64,
        annotation: String,
    ) -> Option<TradeRecord> {
        let open = self.state.open()?;
        let side = open.position.side();
        let size = open.position.size();
        let fill = self.execute(side, action, price, size, Liquidity::Taker)?;
        let open = self.state.take()?;

        let pnl = open.position.unrealized_pnl(fill.price);
        self.account.realize(pnl);
        self.account.pay_fee(fill.fee);
        if open.rule == BreakoutRule::Fast {
            self.memory.record(side, Outcome::from_pnl(pnl));
        }

        info!(
            timestamp = %bar.timestamp,
            side = %side,
            action = action.as_str(),
            price = fill.price,
            units = open.position.unit_count(),
            pnl,
            "position closed"
        );

        Some(TradeRecord {
            timestamp: bar.timestamp,
            side,
            action,
            price: fill.price,
            quantity: fill.quantity,
            fee: fill.fee,
            slippage: fill.slippage,
            annotation,
        })
    }

    /// Volatility-scaled unit size against realized equity, or `None` when N
    /// is degenerate or the unit would breach the leverage ceiling at `close`.
    fn size_unit(&self, n: f64, close: f64) -> Option<f64> {
        if !(n.is_finite() && n > 0.0) {
            return None;
        }
        let equity = self.account.cash();
        let risk = &self.config.risk;
        let quantity = equity * risk.risk_pct / 100.0 / (risk.stop_multiple * n);
        if !(quantity.is_finite() && quantity > 0.0) {
            return None;
        }

        let held = self.state.open().map_or(0.0, |open| open.position.size());
        let notional_after = (held + quantity) * close;
        if notional_after > equity * risk.leverage + LEVERAGE_EPSILON {
            debug!(notional_after, equity, leverage = risk.leverage, "leverage cap");
            return None;
        }
        Some(quantity)
    }

    fn execute(
        &self,
        side: Side,
        action: TradeAction,
        price: f64,
        quantity: f64,
        liquidity: Liquidity,
    ) -> Option<Fill> {
        match self.fills.fill(side, action, price, quantity, liquidity) {
            FillOutcome::Filled(fill) => Some(fill),
            FillOutcome::Rejected(reason) => {
                debug!(side = %side, action = action.as_str(), ?reason, "fill rejected");
                None
            }
        }
    }
}

/// Stop level `stop_multiple × n` on the adverse side of `price`.
pub fn stop_for(side: Side, price: f64, n: f64, stop_multiple: f64) -> f64 {
    price - side.sign() * stop_multiple * n
}

/// Add levels anchored at the first unit's price.
pub fn ladder_for(side: Side, first_price: f64, n: f64, step: f64, max_units: usize) -> Vec<f64> {
    (1..max_units)
        .map(|k| first_price + side.sign() * k as f64 * step * n)
        .collect()
}
