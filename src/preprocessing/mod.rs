//! Data preprocessing module
//!
//! Turns an uploaded sales table into the numeric feature matrix the forest
//! is fitted on:
//! - Label encoding of categorical columns
//! - Column validation and type coercion
//! - Trailing averages over the sales history

mod encoder;
mod frame;

pub use encoder::{CategoricalEncoders, LabelEncoder};
pub use frame::{feature_matrix, prepare_frame, target_vector, trailing_average, TRAILING_WINDOW};
