//! Training configuration

use super::decision_tree::Criterion;
use super::random_forest::{MaxFeatures, RandomForest};
use serde::{Deserialize, Serialize};

/// Configuration for fitting one menu item's demand model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Number of trees in the forest
    pub n_estimators: usize,

    /// Seed shared by bootstrap sampling and split feature draws
    pub random_state: u64,

    /// Maximum tree depth (None = grow until pure)
    pub max_depth: Option<usize>,

    /// Minimum samples to split a node
    pub min_samples_split: usize,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,

    /// Features considered per split
    pub max_features: MaxFeatures,

    /// Criterion used to score splits
    pub criterion: Criterion,

    /// Uploads with fewer rows are rejected with `InsufficientData`
    pub min_rows: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            random_state: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            criterion: Criterion::MSE,
            min_rows: 5,
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Set random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples per leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the minimum accepted row count
    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    /// Unfitted forest with these hyperparameters
    pub fn build_forest(&self) -> RandomForest {
        let forest = RandomForest::new_regressor(self.n_estimators)
            .with_random_state(self.random_state)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(self.max_features)
            .with_criterion(self.criterion);

        match self.max_depth {
            Some(depth) => forest.with_max_depth(depth),
            None => forest,
        }
    }
}
