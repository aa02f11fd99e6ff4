//! Error types for the TimeFrame operation tracker.

use thiserror::Error;

/// Errors surfaced by the public API.
///
/// Failures raised by caller code inside a scope are never reported through
/// this type; they are classified via [`crate::category::Failure`] and
/// recorded in the root's traceback log instead.
#[derive(Debug, Error)]
pub enum TimeFrameError {
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Report does not fit in {budget} bytes (smallest rendering is {smallest} bytes)")]
    BudgetExceeded { budget: usize, smallest: usize },

    #[error("Invalid render style: {0}")]
    InvalidStyle(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for TimeFrameError {
    fn from(err: config::ConfigError) -> Self {
        TimeFrameError::ConfigError(err.to_string())
    }
}
