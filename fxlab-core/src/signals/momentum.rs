//! Time-series momentum — the sign of the rolling mean of log returns.

use super::SignalGenerator;
use crate::domain::{Bar, Signal};
use crate::indicators::sma_of_series;

#[derive(Debug, Clone)]
pub struct Momentum {
    pub window: usize,
}

impl Momentum {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "momentum window must be >= 1");
        Self { window }
    }
}

/// ln(close[t] / close[t-1]); NaN at t = 0.
pub fn log_returns(bars: &[Bar]) -> Vec<f64> {
    std::iter::once(f64::NAN)
        .chain(bars.windows(2).map(|w| (w[1].close / w[0].close).ln()))
        .collect()
}

impl SignalGenerator for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn lookback(&self) -> usize {
        self.window
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        sma_of_series(&log_returns(bars), self.window)
            .into_iter()
            .map(Signal::from_sign)
            .collect()
    }
}
