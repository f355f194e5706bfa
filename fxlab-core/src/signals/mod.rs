//! Signal generation — one directional intent per bar.
//!
//! Generators see only bar history. The value at bar t must depend on bars
//! `0..=t` alone, and is `Flat` wherever an indicator input is still in its
//! warmup window. The engine acts on the signal of bar t at the open of
//! bar t+1.

pub mod ma_crossover;
pub mod mean_reversion;
pub mod momentum;
pub mod trend_filter;

pub use ma_crossover::{MaCrossover, MaType};
pub use mean_reversion::MeanReversion;
pub use momentum::Momentum;
pub use trend_filter::{RsiBounds, TrendFilter};

use crate::domain::{Bar, Signal};
use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Trait for signal generators.
pub trait SignalGenerator: Send + Sync {
    /// Human-readable name (e.g., "ma_crossover").
    fn name(&self) -> &str;

    /// Number of leading bars whose signal is always `Flat`.
    fn lookback(&self) -> usize;

    /// Produce a signal series aligned 1:1 with `bars`.
    fn generate(&self, bars: &[Bar]) -> Vec<Signal>;
}

/// Trading-hours window for new entries.
///
/// Hours are the bar timestamp's hour. A window with `start_hour >
/// end_hour` wraps past midnight (e.g. 22..6). The window only decides
/// whether a signal may open a position; it never alters the signal itself,
/// so positions carried out of the window are closed by their own exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SessionWindow {
    pub fn contains(&self, bar: &Bar) -> bool {
        let hour = bar.timestamp.hour();
        if self.start_hour < self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    /// Per-bar entry permission, aligned with `bars`.
    pub fn entry_mask(&self, bars: &[Bar]) -> Vec<bool> {
        bars.iter().map(|bar| self.contains(bar)).collect()
    }
}
