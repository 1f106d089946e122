//! Error types for zonetarif

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// zonetarif errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed numbers, missing columns, out-of-range parameters
    #[error("Input validation error: {0}")]
    InputValidation(String),

    /// Division by zero and other non-finite results
    #[error("Computation error: {0}")]
    Computation(String),

    /// Unknown tranche or zone label
    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn input(msg: impl Into<String>) -> Self {
        Error::InputValidation(msg.into())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
