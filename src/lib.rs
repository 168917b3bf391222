//! Menu forecast - per-menu-item serving demand forecasting
//!
//! Each (restaurant, menu item) pair owns one model: a random forest
//! regressor over six encoded features, persisted together with the label
//! encoders it was trained with.
//!
//! # Modules
//!
//! ## Core
//! - [`features`] - Feature schema and the typed feature record
//! - [`preprocessing`] - Column validation, label encoding, trailing averages
//! - [`training`] - Decision trees, random forest and the per-item trainer
//! - [`inference`] - Artifact-backed predictor
//!
//! ## Storage
//! - [`export`] - Model artifacts, checksummed blobs and the artifact store
//! - [`cache`] - In-process cache of loaded artifacts
//! - [`utils`] - CSV loading and upload storage
//!
//! ## Services
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core
pub mod features;
pub mod preprocessing;
pub mod training;
pub mod inference;

// Storage
pub mod export;
pub mod cache;
pub mod utils;

// Services
pub mod server;
pub mod cli;

pub use error::{ForecastError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ForecastError, Result};

    // Features
    pub use crate::features::{FeatureRecord, FeatureValue, RawFeatures, FEATURE_ORDER};

    // Preprocessing
    pub use crate::preprocessing::{CategoricalEncoders, LabelEncoder};

    // Training
    pub use crate::training::{RandomForest, Trainer, TrainerConfig, TrainingReport};

    // Inference
    pub use crate::inference::{Prediction, PredictionResponse, Predictor, PredictorConfig};

    // Storage
    pub use crate::export::{
        ArtifactHandle, ArtifactMetadata, ArtifactStore, FsArtifactStore, MemoryArtifactStore,
        ModelArtifact,
    };
    pub use crate::utils::{DataLoader, UploadStore};
}
