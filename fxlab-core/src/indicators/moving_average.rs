//! SMA and EMA of closes as [`Indicator`]s. Lookback for both: period - 1.

use super::smoothing::{ema_of_series, sma_of_series};
use super::{closes, Indicator};
use crate::domain::Bar;

fn label(kind: &str, period: usize) -> String {
    assert!(period >= 1, "{kind} period must be >= 1");
    format!("{kind}_{period}")
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self {
            name: label("sma", period),
            period,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        sma_of_series(&closes(bars), self.period)
    }
}

/// Seeded with the SMA of the first `period` closes.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            name: label("ema", period),
            period,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        ema_of_series(&closes(bars), self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn names_and_lookbacks() {
        assert_eq!(Sma::new(50).name(), "sma_50");
        assert_eq!(Ema::new(200).name(), "ema_200");
        assert_eq!(Sma::new(50).lookback(), 49);
        assert_eq!(Ema::new(1).lookback(), 0);
    }

    #[test]
    #[should_panic(expected = "ema period must be >= 1")]
    fn zero_period_panics() {
        Ema::new(0);
    }

    #[test]
    fn first_valid_index_matches_lookback() {
        let bars = make_bars(&[150.10, 150.25, 150.05, 150.40, 150.30, 150.55]);
        for ind in [Box::new(Sma::new(4)) as Box<dyn Indicator>, Box::new(Ema::new(4))] {
            let out = ind.compute(&bars);
            let lb = ind.lookback();
            assert!(out[..lb].iter().all(|v| v.is_nan()), "{}", ind.name());
            assert!(out[lb..].iter().all(|v| v.is_finite()), "{}", ind.name());
        }
    }

    #[test]
    fn ema_reacts_faster_than_sma() {
        // flat, then a jump: the EMA closes more of the gap on the jump bar
        let mut closes = vec![100.0; 10];
        closes.push(110.0);
        let bars = make_bars(&closes);
        let sma = Sma::new(5).compute(&bars);
        let ema = Ema::new(5).compute(&bars);
        assert_approx(sma[10], 102.0, 1e-9);
        assert_approx(ema[10], 100.0 + 10.0 / 3.0, 1e-9);
        assert!(ema[10] > sma[10]);
    }
}
