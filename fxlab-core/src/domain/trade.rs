//! Trade — a completed round trip: entry, exit, size, realized P&L.

use super::signal::Direction;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SignalReversal,
    /// Forced close at the last bar's close.
    EndOfSeries,
}

impl ExitReason {
    pub const ALL: [ExitReason; 4] = [
        ExitReason::StopLoss,
        ExitReason::TakeProfit,
        ExitReason::SignalReversal,
        ExitReason::EndOfSeries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::SignalReversal => "signal_reversal",
            ExitReason::EndOfSeries => "end_of_series",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable closed-trade record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub size: f64,

    // ── PnL ──
    pub gross_pnl: f64,
    pub cost: f64,
    /// Realized P&L net of costs.
    pub pnl_amount: f64,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl_amount > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.pnl_amount < 0.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    /// Signed price move captured, before costs.
    pub fn price_move(&self) -> f64 {
        (self.exit_price - self.entry_price) * self.direction.sign()
    }

    /// Return on the trade as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 || self.size == 0.0 {
            return 0.0;
        }
        self.pnl_amount / (self.entry_price * self.size)
    }
}
