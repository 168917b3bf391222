//! Model training
//!
//! A bootstrapped random forest of regression trees, fitted per menu item on
//! label-encoded features.

mod config;
mod metrics;
mod trainer;
pub mod decision_tree;
pub mod random_forest;

pub use config::TrainerConfig;
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use metrics::RegressionMetrics;
pub use random_forest::{MaxFeatures, RandomForest};
pub use trainer::{FeatureImportance, Trainer, TrainingReport};
