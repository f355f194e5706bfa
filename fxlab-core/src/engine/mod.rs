//! Backtesting engine — single-position, bar-by-bar state machine.
//!
//! The engine consumes a time-ordered bar series and an aligned signal
//! series, and walks the bars once:
//!
//! 1. Exit check: stop-loss, then take-profit, then signal reversal
//! 2. Entry check: size a new position from the previous bar's signal
//! 3. Mark-to-market: record equity at the bar's close
//!
//! A position still open after the last bar is closed at that bar's close.

pub mod costs;
pub mod error;
pub mod loop_runner;
pub mod sizing;
pub mod state;

pub use costs::CostModel;
pub use error::{EngineError, PreconditionError};
pub use loop_runner::{run_backtest, run_backtest_gated};
pub use sizing::RiskSizer;
pub use state::{EngineConfig, EngineState, ReversalPolicy, RunOutcome, RunResult, VolatilityStops};
