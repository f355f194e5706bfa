//! Trading signals and trade direction.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Desired exposure emitted by a signal generator for one bar.
///
/// Serialized as the integers -1, 0 and +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Signal {
    Short,
    #[default]
    Flat,
    Long,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("signal value must be -1, 0 or 1, got {0}")]
    OutOfRange(i8),
}

impl Signal {
    /// Direction a non-flat signal asks for.
    pub fn direction(self) -> Option<Direction> {
        match self {
            Signal::Long => Some(Direction::Long),
            Signal::Short => Some(Direction::Short),
            Signal::Flat => None,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Signal::Flat
    }

    /// Signal whose sign matches `value`. Zero and NaN map to `Flat`.
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Signal::Long
        } else if value < 0.0 {
            Signal::Short
        } else {
            Signal::Flat
        }
    }
}

impl TryFrom<i8> for Signal {
    type Error = SignalError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Signal::Short),
            0 => Ok(Signal::Flat),
            1 => Ok(Signal::Long),
            other => Err(SignalError::OutOfRange(other)),
        }
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> i8 {
        match signal {
            Signal::Short => -1,
            Signal::Flat => 0,
            Signal::Long => 1,
        }
    }
}

/// Side of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}
