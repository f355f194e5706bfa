//! Series smoothers shared by the indicators and signal generators.
//!
//! All three work on a plain `&[f64]` and return a series of the same
//! length, NaN wherever the output is undefined:
//! - `sma_of_series`: rolling mean; any NaN in the window gives NaN
//! - `ema_of_series`: exponential, alpha = 2 / (period + 1)
//! - `wilder_smooth`: exponential, alpha = 1 / period
//!
//! The exponential smoothers seed with the mean of the first run of `period`
//! consecutive non-NaN inputs, so a leading NaN run (e.g. a return series)
//! only delays the seed. A NaN after the seed ends the output.

/// Rolling mean over `period` values.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    // Each window is summed on its own: identical windows give identical
    // means wherever they occur in the series.
    for (start, window) in values.windows(period).enumerate() {
        out[start + period - 1] = window.iter().sum::<f64>() / period as f64;
    }
    out
}

/// Exponential moving average, alpha = 2 / (period + 1).
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    seeded_exponential(values, period, 2.0 / (period as f64 + 1.0))
}

/// Wilder's smoothing, alpha = 1 / period.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    seeded_exponential(values, period, 1.0 / period as f64)
}

fn seeded_exponential(values: &[f64], period: usize, alpha: f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    let Some(seed_at) = first_clean_run(values, period) else {
        return out;
    };

    let mut level = values[seed_at + 1 - period..=seed_at].iter().sum::<f64>() / period as f64;
    out[seed_at] = level;

    for (slot, &v) in out[seed_at + 1..].iter_mut().zip(&values[seed_at + 1..]) {
        if v.is_nan() {
            break;
        }
        level += alpha * (v - level);
        *slot = level;
    }
    out
}

/// Index closing the first run of `period` consecutive non-NaN values.
fn first_clean_run(values: &[f64], period: usize) -> Option<usize> {
    let mut run = 0;
    values.iter().position(|v| {
        run = if v.is_nan() { 0 } else { run + 1 };
        run == period
    })
}
