//! Engine configuration, mutable state, and run result types.

use super::error::PreconditionError;
use crate::domain::{AccountState, Direction, Position, Signal, Trade};
use serde::{Deserialize, Serialize};

/// Which prevailing signals close an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReversalPolicy {
    /// Close on an opposite signal or on Flat.
    #[default]
    OppositeOrFlat,
    /// Close only on an opposite signal; Flat holds the position.
    OppositeOnly,
}

impl ReversalPolicy {
    /// Whether `signal` closes a position held in `direction`.
    pub fn closes(self, direction: Direction, signal: Signal) -> bool {
        match signal.direction() {
            Some(d) => d != direction,
            None => self == ReversalPolicy::OppositeOrFlat,
        }
    }
}

/// ATR-scaled stop and target distances, evaluated on the signal bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityStops {
    pub period: usize,
    pub stop_multiplier: f64,
    /// 0 disables the target.
    #[serde(default)]
    pub target_multiplier: f64,
}

/// Configuration for a single backtest run.
///
/// Distances are in price units. Money amounts are in account currency;
/// `point_value` converts a 1.0 price move on one unit of size into money.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub initial_capital: f64,
    pub risk_fraction: f64,
    pub stop_loss_distance: f64,
    /// 0 disables take-profit.
    #[serde(default)]
    pub take_profit_distance: f64,
    /// Flat fee charged once per closed trade.
    #[serde(default)]
    pub transaction_cost: f64,
    /// Price-unit spread charged once per closed trade.
    #[serde(default)]
    pub spread: f64,
    #[serde(default = "default_point_value")]
    pub point_value: f64,
    #[serde(default = "default_max_position_size")]
    pub max_position_size: f64,
    #[serde(default)]
    pub min_position_size: f64,
    #[serde(default)]
    pub size_step: Option<f64>,
    /// Signals at indices below this are never acted on.
    #[serde(default)]
    pub warmup_bars: usize,
    #[serde(default)]
    pub reversal: ReversalPolicy,
    #[serde(default)]
    pub volatility_stops: Option<VolatilityStops>,
}

fn default_point_value() -> f64 {
    1.0
}

fn default_max_position_size() -> f64 {
    f64::MAX
}

impl EngineConfig {
    /// Frictionless config with fixed stop/target distances.
    pub fn new(
        initial_capital: f64,
        risk_fraction: f64,
        stop_loss_distance: f64,
        take_profit_distance: f64,
    ) -> Self {
        Self {
            initial_capital,
            risk_fraction,
            stop_loss_distance,
            take_profit_distance,
            transaction_cost: 0.0,
            spread: 0.0,
            point_value: default_point_value(),
            max_position_size: default_max_position_size(),
            min_position_size: 0.0,
            size_step: None,
            warmup_bars: 0,
            reversal: ReversalPolicy::default(),
            volatility_stops: None,
        }
    }

    pub fn with_warmup(mut self, warmup_bars: usize) -> Self {
        self.warmup_bars = warmup_bars;
        self
    }

    pub fn validate(&self) -> Result<(), PreconditionError> {
        let positive = |field: &'static str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(PreconditionError::config(field, format!("must be > 0, got {v}")))
            }
        };
        let non_negative = |field: &'static str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(PreconditionError::config(field, format!("must be >= 0, got {v}")))
            }
        };

        positive("initial_capital", self.initial_capital)?;
        if !(self.risk_fraction > 0.0 && self.risk_fraction <= 1.0) {
            return Err(PreconditionError::config(
                "risk_fraction",
                format!("must be in (0, 1], got {}", self.risk_fraction),
            ));
        }
        positive("stop_loss_distance", self.stop_loss_distance)?;
        non_negative("take_profit_distance", self.take_profit_distance)?;
        non_negative("transaction_cost", self.transaction_cost)?;
        non_negative("spread", self.spread)?;
        positive("point_value", self.point_value)?;
        if self.max_position_size.is_nan() || self.max_position_size <= 0.0 {
            return Err(PreconditionError::config(
                "max_position_size",
                format!("must be > 0, got {}", self.max_position_size),
            ));
        }
        non_negative("min_position_size", self.min_position_size)?;
        if self.min_position_size > self.max_position_size {
            return Err(PreconditionError::config(
                "min_position_size",
                "must not exceed max_position_size",
            ));
        }
        if let Some(step) = self.size_step {
            positive("size_step", step)?;
        }
        if let Some(vol) = &self.volatility_stops {
            if vol.period == 0 {
                return Err(PreconditionError::config(
                    "volatility_stops.period",
                    "must be >= 1",
                ));
            }
            positive("volatility_stops.stop_multiplier", vol.stop_multiplier)?;
            non_negative("volatility_stops.target_multiplier", vol.target_multiplier)?;
        }
        Ok(())
    }
}

/// Mutable state that evolves bar-by-bar during the engine loop.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub account: AccountState,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    /// Initial capital, then the balance after each closed trade.
    pub balance_history: Vec<f64>,
    pub bar_index: usize,
    /// Non-flat signals evaluated for entry while flat.
    pub signal_count: usize,
    /// Evaluated signals that did not lead to an entry.
    pub skipped_entries: usize,
}

impl EngineState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            account: AccountState::new(initial_capital),
            position: None,
            trades: Vec::new(),
            balance_history: vec![initial_capital],
            bar_index: 0,
            signal_count: 0,
            skipped_entries: 0,
        }
    }

    /// Book a closed trade against the account.
    pub fn record_trade(&mut self, trade: Trade) {
        self.account.apply(trade.pnl_amount);
        self.balance_history.push(self.account.balance);
        self.trades.push(trade);
    }

    /// Balance plus the open position's gross P&L at `price`.
    pub fn mark_to_market(&self, price: f64, point_value: f64) -> f64 {
        self.account.balance
            + self
                .position
                .as_ref()
                .map_or(0.0, |p| p.unrealized_pnl(price, point_value))
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunOutcome {
    Completed,
    /// Balance fell to zero or below on the given bar; later bars were skipped.
    Ruined { bar_index: usize },
}

/// Result of a completed backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub balance_history: Vec<f64>,
    /// Mark-to-market equity at each processed bar's close.
    pub equity_curve: Vec<f64>,
    pub final_balance: f64,
    pub peak_balance: f64,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub signal_count: usize,
    pub skipped_entries: usize,
    pub outcome: RunOutcome,
}

impl RunResult {
    pub fn is_ruined(&self) -> bool {
        matches!(self.outcome, RunOutcome::Ruined { .. })
    }
}
