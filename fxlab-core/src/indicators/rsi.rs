//! Relative Strength Index, Wilder's formulation.
//!
//! Gains and losses of consecutive closes are each Wilder-smoothed, then
//! RSI = 100 - 100 / (1 + gain / loss). Lookback: period.

use super::smoothing::wilder_smooth;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "rsi period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        // No change is defined for bar 0.
        let (gains, losses): (Vec<f64>, Vec<f64>) = std::iter::once((f64::NAN, f64::NAN))
            .chain(bars.windows(2).map(|w| {
                let change = w[1].close - w[0].close;
                if change.is_nan() {
                    (f64::NAN, f64::NAN)
                } else {
                    (change.max(0.0), (-change).max(0.0))
                }
            }))
            .take(bars.len())
            .unzip();

        wilder_smooth(&gains, self.period)
            .into_iter()
            .zip(wilder_smooth(&losses, self.period))
            .map(|(g, l)| strength(g, l))
            .collect()
    }
}

/// Map smoothed gain/loss onto 0..=100. No movement at all reads as 50.
fn strength(gain: f64, loss: f64) -> f64 {
    if gain.is_nan() || loss.is_nan() {
        f64::NAN
    } else if loss == 0.0 {
        if gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + gain / loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    #[test]
    fn steady_rise_is_100() {
        let bars = make_bars(&[1.10, 1.11, 1.12, 1.13, 1.14]);
        let out = Rsi::new(2).compute(&bars);
        assert!(out[1].is_nan());
        assert_approx(out[2], 100.0, 1e-9);
        assert_approx(out[4], 100.0, 1e-9);
    }

    #[test]
    fn steady_fall_is_0() {
        let bars = make_bars(&[1.14, 1.13, 1.12, 1.11]);
        assert_approx(Rsi::new(2).compute(&bars)[3], 0.0, 1e-9);
    }

    #[test]
    fn no_movement_is_50() {
        let out = Rsi::new(3).compute(&make_bars(&[150.0; 5]));
        assert_approx(out[3], 50.0, 1e-9);
        assert_approx(out[4], 50.0, 1e-9);
    }

    #[test]
    fn seed_then_wilder_update() {
        // changes +2, -1, +3, -2 with period 2:
        // seed gain 1.0, loss 0.5 → RSI 66.67
        // next: gain 2.0, loss 0.25 → RSI 88.89
        // next: gain 1.0, loss 1.125 → RSI 47.06
        let bars = make_bars(&[100.0, 102.0, 101.0, 104.0, 102.0]);
        let out = Rsi::new(2).compute(&bars);
        assert_approx(out[2], 100.0 - 100.0 / 3.0, 1e-9);
        assert_approx(out[3], 100.0 - 100.0 / 9.0, 1e-9);
        assert_approx(out[4], 100.0 - 100.0 / (1.0 + 1.0 / 1.125), 1e-9);
    }

    #[test]
    fn stays_in_range_on_choppy_data() {
        let bars = make_bars(&[145.2, 146.1, 144.8, 147.3, 143.9, 148.0, 142.5, 149.1]);
        for v in Rsi::new(3).compute(&bars).into_iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn output_length_matches_input() {
        assert!(Rsi::new(14).compute(&[]).is_empty());
        assert_eq!(Rsi::new(14).compute(&make_bars(&[1.0, 2.0])).len(), 2);
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
