//! Structured error types for the DecoDen workspace.

use thiserror::Error;

/// Unified error type for all DecoDen operations.
#[derive(Debug, Error)]
pub enum DecodenError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed track, BED or JSON input)
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Conditions list, replicate counts or column layout disagree with the data
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Fewer qualifying observations than a stage needs
    #[error("insufficient data: requested {requested}, only {available} available")]
    InsufficientData { requested: usize, available: usize },

    /// Rejected configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the DecoDen workspace.
pub type Result<T> = std::result::Result<T, DecodenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = DecodenError::InsufficientData {
            requested: 500,
            available: 12,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: requested 500, only 12 available"
        );
    }

    #[test]
    fn io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.bdg");
        let err: DecodenError = io.into();
        assert!(matches!(err, DecodenError::Io(_)));
        assert!(err.to_string().contains("missing.bdg"));
    }

    #[test]
    fn shape_mismatch_message() {
        let err = DecodenError::ShapeMismatch("expected 8 columns, found 7".into());
        assert_eq!(err.to_string(), "shape mismatch: expected 8 columns, found 7");
    }
}
