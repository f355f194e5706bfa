//! Moving average crossover state — Long while the fast MA is above the slow
//! MA, Short while it is below.

use super::SignalGenerator;
use crate::domain::{Bar, Signal};
use crate::indicators::{closes, ema_of_series, sma_of_series};
use serde::{Deserialize, Serialize};

/// Moving average type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaType {
    #[default]
    Sma,
    Ema,
}

impl MaType {
    fn series(self, values: &[f64], period: usize) -> Vec<f64> {
        match self {
            MaType::Sma => sma_of_series(values, period),
            MaType::Ema => ema_of_series(values, period),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaCrossover {
    pub fast_period: usize,
    pub slow_period: usize,
    pub ma_type: MaType,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize, ma_type: MaType) -> Self {
        assert!(fast_period >= 1, "fast_period must be >= 1");
        assert!(slow_period > fast_period, "slow_period must be > fast_period");
        Self {
            fast_period,
            slow_period,
            ma_type,
        }
    }

    pub fn default_params() -> Self {
        Self::new(42, 252, MaType::Sma)
    }
}

impl SignalGenerator for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn lookback(&self) -> usize {
        self.slow_period - 1
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        let closes = closes(bars);
        let fast = self.ma_type.series(&closes, self.fast_period);
        let slow = self.ma_type.series(&closes, self.slow_period);
        fast.iter()
            .zip(&slow)
            .map(|(f, s)| Signal::from_sign(f - s))
            .collect()
    }
}
