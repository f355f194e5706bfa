//! Trend-following pullback filter.
//!
//! Long when all of the following hold on bar t (Short is the mirror image):
//! - close above the trend EMA
//! - fast EMA above slow EMA
//! - close below the fast EMA (pullback into the trend), if required
//! - slow-EMA slope over `slope_lag` bars above `slope_threshold`
//! - ADX above `adx_threshold` with +DI above -DI
//! - RSI below the overbought bound, if an RSI filter is configured

use super::SignalGenerator;
use crate::domain::{Bar, Signal};
use crate::indicators::{closes, directional_index, ema_of_series, Indicator, Rsi};
use serde::{Deserialize, Serialize};

/// Optional RSI guard: no longs at or above `overbought`, no shorts at or
/// below `oversold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiBounds {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

#[derive(Debug, Clone)]
pub struct TrendFilter {
    pub fast_period: usize,
    pub slow_period: usize,
    pub trend_period: usize,
    pub slope_lag: usize,
    pub slope_threshold: f64,
    pub adx_period: usize,
    pub adx_threshold: f64,
    pub require_pullback: bool,
    pub rsi: Option<RsiBounds>,
}

impl TrendFilter {
    pub fn default_params() -> Self {
        Self {
            fast_period: 20,
            slow_period: 80,
            trend_period: 200,
            slope_lag: 5,
            slope_threshold: 0.0,
            adx_period: 14,
            adx_threshold: 25.0,
            require_pullback: true,
            rsi: None,
        }
    }
}

impl SignalGenerator for TrendFilter {
    fn name(&self) -> &str {
        "trend_filter"
    }

    fn lookback(&self) -> usize {
        let ema = self
            .trend_period
            .max(self.slow_period + self.slope_lag)
            .max(self.fast_period)
            .saturating_sub(1);
        let rsi = self.rsi.map_or(0, |r| r.period);
        ema.max(2 * self.adx_period).max(rsi)
    }

    fn generate(&self, bars: &[Bar]) -> Vec<Signal> {
        let n = bars.len();
        let closes = closes(bars);
        let fast = ema_of_series(&closes, self.fast_period);
        let slow = ema_of_series(&closes, self.slow_period);
        let trend = ema_of_series(&closes, self.trend_period);
        let di = directional_index(bars, self.adx_period);
        let rsi = self.rsi.map(|r| Rsi::new(r.period).compute(bars));

        (0..n)
            .map(|i| {
                if i < self.slope_lag {
                    return Signal::Flat;
                }
                let close = closes[i];
                let slope = slow[i] - slow[i - self.slope_lag];
                let inputs = [
                    fast[i],
                    slow[i],
                    trend[i],
                    slope,
                    di.adx[i],
                    di.plus_di[i],
                    di.minus_di[i],
                ];
                if inputs.iter().any(|v| v.is_nan()) {
                    return Signal::Flat;
                }
                if di.adx[i] <= self.adx_threshold {
                    return Signal::Flat;
                }
                let rsi_value = match (&rsi, self.rsi) {
                    (Some(series), Some(_)) if series[i].is_nan() => return Signal::Flat,
                    (Some(series), Some(bounds)) => Some((series[i], bounds)),
                    _ => None,
                };

                let long = close > trend[i]
                    && fast[i] > slow[i]
                    && (!self.require_pullback || close < fast[i])
                    && slope > self.slope_threshold
                    && di.plus_di[i] > di.minus_di[i]
                    && rsi_value.map_or(true, |(v, b)| v < b.overbought);
                let short = close < trend[i]
                    && fast[i] < slow[i]
                    && (!self.require_pullback || close > fast[i])
                    && slope < -self.slope_threshold
                    && di.minus_di[i] > di.plus_di[i]
                    && rsi_value.map_or(true, |(v, b)| v > b.oversold);

                if long {
                    Signal::Long
                } else if short {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            })
            .collect()
    }
}
