//! Domain types for FxLab: bars, signals, positions, closed trades, account state.

pub mod account;
pub mod bar;
pub mod position;
pub mod signal;
pub mod trade;

pub use account::AccountState;
pub use bar::Bar;
pub use position::Position;
pub use signal::{Direction, Signal, SignalError};
pub use trade::{ExitReason, Trade};
