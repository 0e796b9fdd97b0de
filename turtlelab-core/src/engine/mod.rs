//! Backtesting engine — signals, directional memory, the position state
//! machine and the bar loop that drives it.

pub mod accounting;
pub mod loop_runner;
pub mod memory;
pub mod signals;
pub mod state_machine;

pub use accounting::Account;
pub use loop_runner::{run_backtest, BacktestReport};
pub use memory::{DirectionalMemory, Outcome};
pub use signals::{BreakoutRule, SignalKind};
pub use state_machine::{ladder_for, stop_for, OpenPosition, PositionState, PositionStateMachine};
