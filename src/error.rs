use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors surfaced by the usage reconciliation passes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("Invalid usage window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Never fatal. Reconciliation skips the offending event and keeps going.
    #[error("Malformed usage event: {0}")]
    MalformedEvent(String),
}
