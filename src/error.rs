//! Error types for demand training and prediction

use thiserror::Error;

/// Result type alias for forecasting operations
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Main error type for the forecasting core
///
/// Every failure is returned to the caller as a value. Nothing in the core
/// retries; a new call with corrected input is the only way forward.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// No artifact has been published for the requested key
    #[error("menu item `{menu_item}` has not been trained yet for restaurant `{restaurant_id}`")]
    NotTrained {
        restaurant_id: String,
        menu_item: String,
    },

    /// A categorical value was not part of the vocabulary seen during training
    #[error("invalid input value `{value}` for `{field}`")]
    InvalidCategory { field: String, value: String },

    /// A feature value could not be coerced to the expected type
    #[error("invalid feature `{field}`: {reason}")]
    InvalidFeature { field: String, reason: String },

    /// Training input is missing columns or carries non-coercible values
    #[error("malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("insufficient training data: need at least {required} rows, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Restaurant id or menu item cannot be mapped to a storage location
    #[error("invalid artifact key: {0}")]
    InvalidKey(String),

    /// Artifact unreadable, unwritable or corrupted
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

impl ForecastError {
    /// Short machine-readable tag, used in structured error records
    pub fn kind(&self) -> &'static str {
        match self {
            ForecastError::NotTrained { .. } => "not_trained",
            ForecastError::InvalidCategory { .. } => "invalid_category",
            ForecastError::InvalidFeature { .. } => "invalid_feature",
            ForecastError::MalformedDataset(_) => "malformed_dataset",
            ForecastError::InsufficientData { .. } => "insufficient_data",
            ForecastError::InvalidKey(_) => "invalid_key",
            ForecastError::Storage(_) | ForecastError::Io(_) => "storage_failure",
            ForecastError::Serialization(_) => "serialization",
            ForecastError::ShapeError { .. }
            | ForecastError::ModelNotFitted
            | ForecastError::InvalidParameter { .. } => "model",
        }
    }
}

impl From<polars::error::PolarsError> for ForecastError {
    fn from(err: polars::error::PolarsError) -> Self {
        ForecastError::MalformedDataset(err.to_string())
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for ForecastError {
    fn from(err: bincode::Error) -> Self {
        ForecastError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ForecastError {
    fn from(err: ndarray::ShapeError) -> Self {
        ForecastError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
