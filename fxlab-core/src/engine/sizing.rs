//! Fractional-risk position sizing.
//!
//! Size is chosen so that a stop-out loses `risk_fraction` of the current
//! balance:
//!
//! ```text
//! risk_amount = balance * risk_fraction
//! size        = risk_amount / (stop_distance * point_value)
//! ```
//!
//! # Responsibilities
//! - Convert balance + stop distance → position size
//! - Apply the maximum cap, lot-step rounding and the minimum floor
//!
//! # Non-Responsibilities
//! - The sizer does NOT decide entry direction (that's the signal's job)
//! - The sizer does NOT place stops (the engine owns stop placement)

use super::state::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSizer {
    pub risk_fraction: f64,
    pub point_value: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub size_step: Option<f64>,
}

impl RiskSizer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            risk_fraction: config.risk_fraction,
            point_value: config.point_value,
            min_size: config.min_position_size,
            max_size: config.max_position_size,
            size_step: config.size_step,
        }
    }

    /// Position size for a stop `stop_distance` away, or `None` when the
    /// result falls below the minimum (or is not a usable number).
    pub fn size(&self, balance: f64, stop_distance: f64) -> Option<f64> {
        if stop_distance.is_nan() || stop_distance <= 0.0 || balance.is_nan() || balance <= 0.0 {
            return None;
        }
        let raw = balance * self.risk_fraction / (stop_distance * self.point_value);
        let mut size = raw.min(self.max_size);
        if let Some(step) = self.size_step {
            // tolerance keeps 0.3 / 0.1 from flooring to 2
            size = ((size / step) + 1e-9).floor() * step;
        }
        if size.is_finite() && size > 0.0 && size >= self.min_size {
            Some(size)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> RiskSizer {
        RiskSizer {
            risk_fraction: 0.01,
            point_value: 1.0,
            min_size: 0.0,
            max_size: f64::INFINITY,
            size_step: None,
        }
    }

    #[test]
    fn basic_risk_sizing() {
        // 1% of 10_000 = 100 at risk, stop 1.0 away → 100 units
        assert_eq!(sizer().size(10_000.0, 1.0), Some(100.0));
        // stop 2.5 away → 40 units
        assert_eq!(sizer().size(10_000.0, 2.5), Some(40.0));
    }

    #[test]
    fn standard_lot_point_value() {
        // USDJPY: one lot moves 100_000 JPY per 1.00 of price.
        // 1% of 100_000 = 1_000 / (0.15 * 100_000) = 0.0667 lots
        let s = RiskSizer {
            point_value: 100_000.0,
            size_step: Some(0.01),
            ..sizer()
        };
        let size = s.size(100_000.0, 0.15).unwrap();
        assert!((size - 0.06).abs() < 1e-9);
    }

    #[test]
    fn capped_at_max() {
        let s = RiskSizer {
            max_size: 10.0,
            ..sizer()
        };
        assert_eq!(s.size(10_000.0, 1.0), Some(10.0));
    }

    #[test]
    fn floored_to_step() {
        let s = RiskSizer {
            size_step: Some(0.1),
            ..sizer()
        };
        let size = s.size(10_000.0, 3.0).unwrap(); // 33.333...
        assert!((size - 33.3).abs() < 1e-9);
    }

    #[test]
    fn below_min_is_rejected() {
        let s = RiskSizer {
            min_size: 0.01,
            ..sizer()
        };
        // 1% of 0.5 / 1.0 = 0.005 < 0.01
        assert_eq!(s.size(0.5, 1.0), None);
    }

    #[test]
    fn step_rounding_to_zero_is_rejected() {
        let s = RiskSizer {
            size_step: Some(1.0),
            ..sizer()
        };
        assert_eq!(s.size(50.0, 1.0), None);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(sizer().size(10_000.0, 0.0), None);
        assert_eq!(sizer().size(10_000.0, f64::NAN), None);
        assert_eq!(sizer().size(-5.0, 1.0), None);
    }
}
