//! Error types for the simulation core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CardiacError {
    /// Rejected before any simulation work starts.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A step produced NaN or an infinity.
    #[error("numeric divergence at t={time:.4}: {detail}")]
    NumericDivergence { time: f64, detail: String },

    /// An internal bookkeeping check failed (column counts, elapsed time).
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CardiacError>;

pub(crate) fn config_err<T>(msg: impl Into<String>) -> Result<T> {
    Err(CardiacError::Configuration(msg.into()))
}
