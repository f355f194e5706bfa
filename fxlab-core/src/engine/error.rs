//! Engine error taxonomy.
//!
//! Only precondition violations are errors. Running out of money is a normal
//! outcome (`RunOutcome::Ruined`), and undefined statistics are reported as
//! NaN by the reporter.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PreconditionError {
    #[error("bar series has {bars} entries but signal series has {signals}")]
    LengthMismatch { bars: usize, signals: usize },

    #[error("bar series has {bars} entries but entry mask has {mask}")]
    EntryMaskMismatch { bars: usize, mask: usize },

    #[error("timestamp at bar {index} is not strictly after the previous bar")]
    NonMonotonicTimestamp { index: usize },

    #[error("bar {index} has a NaN price")]
    VoidBar { index: usize },

    #[error("invalid config value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("precondition violated: {0}")]
    Precondition(#[from] PreconditionError),
}

impl PreconditionError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        PreconditionError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
