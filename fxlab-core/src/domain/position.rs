//! Position — the single open exposure the engine may hold.

use super::bar::Bar;
use super::signal::Direction;
use super::trade::{ExitReason, Trade};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An open position with its protective levels fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub size: f64,
    pub stop_price: f64,
    /// `None` when take-profit is disabled.
    pub take_profit_price: Option<f64>,
}

impl Position {
    /// Open a position at `entry_price` with stop and target placed
    /// `stop_distance` / `target_distance` away on the appropriate sides.
    /// A zero `target_distance` disables the target.
    pub fn open(
        direction: Direction,
        entry_bar: usize,
        entry_time: NaiveDateTime,
        entry_price: f64,
        size: f64,
        stop_distance: f64,
        target_distance: f64,
    ) -> Self {
        let sign = direction.sign();
        let take_profit_price = if target_distance > 0.0 {
            Some(entry_price + sign * target_distance)
        } else {
            None
        };
        Self {
            direction,
            entry_bar,
            entry_time,
            entry_price,
            size,
            stop_price: entry_price - sign * stop_distance,
            take_profit_price,
        }
    }

    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    pub fn is_short(&self) -> bool {
        self.direction == Direction::Short
    }

    /// Whether the bar's range touched the stop.
    pub fn stop_hit(&self, bar: &Bar) -> bool {
        match self.direction {
            Direction::Long => bar.low <= self.stop_price,
            Direction::Short => bar.high >= self.stop_price,
        }
    }

    /// Whether the bar's range touched the target (false when disabled).
    pub fn target_hit(&self, bar: &Bar) -> bool {
        match (self.direction, self.take_profit_price) {
            (Direction::Long, Some(target)) => bar.high >= target,
            (Direction::Short, Some(target)) => bar.low <= target,
            (_, None) => false,
        }
    }

    /// Gross P&L if the position were closed at `price`.
    pub fn unrealized_pnl(&self, price: f64, point_value: f64) -> f64 {
        (price - self.entry_price) * self.direction.sign() * self.size * point_value
    }

    /// Close the position into an immutable trade record.
    pub fn close(
        self,
        exit_bar: usize,
        exit_time: NaiveDateTime,
        exit_price: f64,
        exit_reason: ExitReason,
        point_value: f64,
        cost: f64,
    ) -> Trade {
        let gross_pnl = self.unrealized_pnl(exit_price, point_value);
        Trade {
            direction: self.direction,
            entry_bar: self.entry_bar,
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_bar,
            exit_time,
            exit_price,
            size: self.size,
            gross_pnl,
            cost,
            pnl_amount: gross_pnl - cost,
            exit_reason,
        }
    }
}
