//! Mean reversion around an SMA.
//!
//! Short when price stretches more than `threshold` above the SMA, Long when
//! more than `threshold` below. The position is closed (Flat) on the bar the
//! price crosses the SMA; between events the last state carries forward.

use super::SignalGenerator;
use crate::domain::{Bar, Signal};
use crate::indicators::{closes, sma_of_series};

#[derive(Debug, Clone)]
pub struct MeanReversion {
    pub sma_period: usize,
    pub threshold: f64,
}

impl MeanReversion {
    pub fn new(sma_period: usize, threshold: f64) -> Self {
        assert!(sma_period >= 1, "sma_period must be >= 1");
        assert!(threshold >= 0.0, "threshold must be >= 0");
        Self {
            sma_period,
            threshold,
        }
    }
}

impl SignalGenerator for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn lookback(&self) -> usize {
        self.sma_period - 1
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        let closes = closes(bars);
        let sma = sma_of_series(&closes, self.sma_period);
        let mut out = Vec::with_capacity(bars.len());
        let mut state = Signal::Flat;
        let mut prev_distance = f64::NAN;

        for (close, mean) in closes.iter().zip(&sma) {
            let distance = close - mean;
            if distance.is_nan() {
                out.push(Signal::Flat);
                continue;
            }
            if distance * prev_distance < 0.0 {
                state = Signal::Flat;
            } else if distance > self.threshold {
                state = Signal::Short;
            } else if distance < -self.threshold {
                state = Signal::Long;
            }
            prev_distance = distance;
            out.push(state);
        }
        out
    }
}
