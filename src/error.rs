//! Error types for multi-view classification

use thiserror::Error;

/// Result type alias for multi-view operations
pub type Result<T> = std::result::Result<T, MultiViewError>;

/// Main error type for the crate
///
/// Every variant is fatal for the current run: the pipeline aborts and
/// surfaces the error to the caller.
#[derive(Error, Debug)]
pub enum MultiViewError {
    #[error("Dataset load error: {0}")]
    DatasetLoad(String),

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Cross-validation error: {0}")]
    CrossValidation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MultiViewError {
    /// Shorthand for a [`MultiViewError::DimensionMismatch`]
    pub fn mismatch(
        context: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        MultiViewError::DimensionMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Shorthand for a [`MultiViewError::InvalidParameter`]
    pub fn invalid_param(name: &str, value: impl ToString, reason: &str) -> Self {
        MultiViewError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for MultiViewError {
    fn from(err: polars::error::PolarsError) -> Self {
        MultiViewError::DatasetLoad(err.to_string())
    }
}

impl From<serde_json::Error> for MultiViewError {
    fn from(err: serde_json::Error) -> Self {
        MultiViewError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MultiViewError {
    fn from(err: ndarray::ShapeError) -> Self {
        MultiViewError::DimensionMismatch {
            context: "feature matrix".to_string(),
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
