//! Bar — one OHLC observation of a single instrument.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Immutable OHLC bar. Intraday series are the norm, so bars carry a full
/// timestamp rather than a date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(timestamp: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    fn prices(&self) -> [f64; 4] {
        [self.open, self.high, self.low, self.close]
    }

    /// A bar with any NaN price is void. The engine rejects series containing one
/// with `PreconditionError::VoidBar`; clean gaps before running.
    pub fn is_void(&self) -> bool {
        self.prices().iter().any(|p| p.is_nan())
    }

    /// Positive prices, all inside the `[low, high]` envelope.
    pub fn is_sane(&self) -> bool {
        !self.is_void()
            && self.low > 0.0
            && self
                .prices()
                .iter()
                .all(|&p| (self.low..=self.high).contains(&p))
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}
