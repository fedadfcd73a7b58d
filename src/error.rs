//! Error types for the housing prediction pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, HousingError>;

/// Main error type for training, persistence, prediction and explanation
#[derive(Error, Debug)]
pub enum HousingError {
    /// Training input is malformed (missing columns, bad target, empty set)
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// Inference input does not conform to the feature schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Model artifact is missing, corrupt, or built for another schema
    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A collected input value lies outside the control bounds
    #[error("Value {value} for {feature} is out of range [{min}, {max}]")]
    OutOfRange {
        feature: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Explanation timed out after {processed} of {total} samples")]
    ExplanationTimeout { processed: usize, total: usize },
}

impl HousingError {
    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        HousingError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for HousingError {
    fn from(err: polars::error::PolarsError) -> Self {
        HousingError::DataShape(err.to_string())
    }
}

impl From<serde_json::Error> for HousingError {
    fn from(err: serde_json::Error) -> Self {
        HousingError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HousingError {
    fn from(err: ndarray::ShapeError) -> Self {
        HousingError::DataShape(err.to_string())
    }
}
