//! Cost model — fixed fee plus spread, charged once per closed trade.

use super::state::EngineConfig;

/// Trading friction for a round trip.
///
/// `transaction_cost` is a flat fee per closed trade; `spread` is in price
/// units and scales with size and point value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub transaction_cost: f64,
    pub spread: f64,
    pub point_value: f64,
}

impl CostModel {
    pub fn new(transaction_cost: f64, spread: f64, point_value: f64) -> Self {
        Self {
            transaction_cost,
            spread,
            point_value,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.transaction_cost, config.spread, config.point_value)
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// Total cost of closing a trade of `size`.
    pub fn trade_cost(&self, size: f64) -> f64 {
        self.transaction_cost + self.spread * size * self.point_value
    }
}
