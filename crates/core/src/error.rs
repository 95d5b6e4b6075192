//! Error types for the tickseq pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tickseq pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input (missing column, unparsable field, duplicate key).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data error (inconsistent or invalid data).
    #[error("Data error: {0}")]
    Data(String),

    /// A non-finite change or outcome was rejected under the fail-fast policy.
    #[error("Non-finite {stage} at index {index}: {value}")]
    NonFinite {
        stage: &'static str,
        index: usize,
        value: f64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a non-finite value error.
    pub fn non_finite(stage: &'static str, index: usize, value: f64) -> Self {
        Error::NonFinite { stage, index, value }
    }
}
