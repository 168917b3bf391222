//! Inference
//!
//! Loads the artifact for a (restaurant, menu item) pair, encodes one feature
//! record with the artifact's own encoders and returns a serving count.

mod config;
mod predictor;

pub use config::PredictorConfig;
pub use predictor::{to_demand, Prediction, PredictionResponse, Predictor};
