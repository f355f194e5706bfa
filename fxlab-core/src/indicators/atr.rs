//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR applies Wilder smoothing (alpha = 1/period) to TR starting at bar 1.
//! Lookback: period.

use super::smoothing::wilder_smooth;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True Range series. TR[0] = high[0] - low[0] (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let hl = bar.high - bar.low;
        let value = match i.checked_sub(1).map(|p| bars[p].close) {
            None => hl,
            Some(pc) => hl.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        };
        // f64::max drops NaN operands; keep NaN inputs visible
        let poisoned = bar.high.is_nan()
            || bar.low.is_nan()
            || (i > 0 && bars[i - 1].close.is_nan());
        tr.push(if poisoned { f64::NAN } else { value });
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let mut tr = true_range(bars);
        // TR[0] is not a proper true range; start the seed at bar 1
        if let Some(first) = tr.first_mut() {
            *first = f64::NAN;
        }
        wilder_smooth(&tr, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // 10
            (102.0, 108.0, 100.0, 106.0), // max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // max(9, 1, 8) = 9
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[(98.0, 102.0, 97.0, 100.0), (110.0, 115.0, 108.0, 112.0)]);
        assert_approx(true_range(&bars)[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_nan_is_visible() {
        let mut bars = make_ohlc_bars(&[(98.0, 102.0, 97.0, 100.0), (110.0, 115.0, 108.0, 112.0)]);
        bars[0].close = f64::NAN;
        assert!(true_range(&bars)[1].is_nan());
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR 8
            (106.0, 107.0, 98.0, 99.0),   // TR 9
            (99.0, 103.0, 97.0, 101.0),   // TR 6
            (101.0, 106.0, 100.0, 105.0), // TR 6
        ]);
        let result = Atr::new(3).compute(&bars);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 14);
    }
}
