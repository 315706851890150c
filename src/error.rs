//! Error types for the regression engine
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`NetworkError`]. The first four variants cover the numeric core; the remaining
//! ones wrap failures from the data and configuration plumbing.

use thiserror::Error;

/// Errors produced by network construction, training and data handling.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Invalid topology, hyperparameter, optimizer kind or loss name.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation was called out of order (backward before forward, step before init).
    #[error("state error: {0}")]
    State(String),

    /// Array dimensions do not line up.
    #[error("shape error: {0}")]
    Shape(String),

    /// Requested functionality exists only as a placeholder.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A data file contained a value that is not a number.
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, NetworkError>;

impl NetworkError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        NetworkError::Config(message.into())
    }

    pub(crate) fn state(message: impl Into<String>) -> Self {
        NetworkError::State(message.into())
    }

    pub(crate) fn shape(message: impl Into<String>) -> Self {
        NetworkError::Shape(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            NetworkError::config("units must be positive").to_string(),
            "configuration error: units must be positive"
        );
        assert_eq!(
            NetworkError::state("no forward pass").to_string(),
            "state error: no forward pass"
        );
        assert_eq!(
            NetworkError::shape("expected 90 columns").to_string(),
            "shape error: expected 90 columns"
        );
        assert_eq!(
            NetworkError::NotImplemented("cross entropy").to_string(),
            "not implemented: cross entropy"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: NetworkError = io.into();
        assert!(matches!(err, NetworkError::Io(_)));
    }
}
