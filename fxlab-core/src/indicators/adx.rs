//! ADX — Average Directional Index (Wilder), with the +DI / -DI lines.
//!
//! 1. +DM / -DM from consecutive highs and lows
//! 2. Wilder-smooth +DM, -DM and TR
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 5. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period.

use super::atr::true_range;
use super::smoothing::wilder_smooth;
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        directional_index(bars, self.period).adx
    }
}

/// The three aligned outputs of the directional movement system.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalIndex {
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
    pub adx: Vec<f64>,
}

/// +DM and -DM per bar. Bar 0 and any pair touching a NaN high/low are NaN.
fn directional_movement(bars: &[Bar]) -> (Vec<f64>, Vec<f64>) {
    let mut plus = Vec::with_capacity(bars.len());
    let mut minus = Vec::with_capacity(bars.len());
    if !bars.is_empty() {
        plus.push(f64::NAN);
        minus.push(f64::NAN);
    }
    for pair in bars.windows(2) {
        let up = pair[1].high - pair[0].high;
        let down = pair[0].low - pair[1].low;
        if up.is_nan() || down.is_nan() {
            plus.push(f64::NAN);
            minus.push(f64::NAN);
            continue;
        }
        plus.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus.push(if down > up && down > 0.0 { down } else { 0.0 });
    }
    (plus, minus)
}

/// Compute +DI, -DI and ADX over `bars`.
pub fn directional_index(bars: &[Bar], period: usize) -> DirectionalIndex {
    let (plus_dm, minus_dm) = directional_movement(bars);
    let mut tr = true_range(bars);
    if let Some(first) = tr.first_mut() {
        *first = f64::NAN;
    }

    let range = wilder_smooth(&tr, period);
    let plus_di: Vec<f64> = wilder_smooth(&plus_dm, period)
        .into_iter()
        .zip(&range)
        .map(|(dm, &r)| if r > 0.0 { 100.0 * dm / r } else { f64::NAN })
        .collect();
    let minus_di: Vec<f64> = wilder_smooth(&minus_dm, period)
        .into_iter()
        .zip(&range)
        .map(|(dm, &r)| if r > 0.0 { 100.0 * dm / r } else { f64::NAN })
        .collect();

    let dx: Vec<f64> = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(&p, &m)| match p + m {
            sum if sum.is_nan() => f64::NAN,
            sum if sum == 0.0 => 0.0,
            sum => 100.0 * (p - m).abs() / sum,
        })
        .collect();

    DirectionalIndex {
        adx: wilder_smooth(&dx, period),
        plus_di,
        minus_di,
    }
}
