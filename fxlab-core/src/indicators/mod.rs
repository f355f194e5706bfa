//! Indicator library.
//!
//! Indicators are pure functions: bar history in, numeric series out. Each is
//! computed once over the whole series before the engine or a signal
//! generator reads it by index.

pub mod adx;
pub mod atr;
pub mod moving_average;
pub mod rsi;
pub mod smoothing;

pub use adx::{directional_index, Adx, DirectionalIndex};
pub use atr::{true_range, Atr};
pub use moving_average::{Ema, Sma};
pub use rsi::Rsi;
pub use smoothing::{ema_of_series, sma_of_series, wilder_smooth};

use crate::domain::Bar;

/// Trait for indicators.
///
/// Indicators take a full bar series and produce an output series of the
/// same length. The first `lookback()` values are `f64::NAN` (warmup), and a
/// NaN input poisons every output whose window contains it.
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on bar t+1 or later. Every
/// indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Extract the close column.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Create synthetic 15-minute bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let data: Vec<(f64, f64, f64, f64)> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + 1.0, open.min(close) - 1.0, close)
        })
        .collect();
    make_ohlc_bars(&data)
}

/// Create 15-minute bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(
                base + chrono::Duration::minutes(15 * i as i64),
                open,
                high,
                low,
                close,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
