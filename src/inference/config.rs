//! Predictor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the predictor's artifact cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    /// Keep loaded artifacts in memory between calls
    pub enable_cache: bool,
    /// Maximum number of cached artifacts
    pub cache_size: usize,
    /// Seconds before a cached artifact is reloaded regardless of revision
    pub cache_ttl_secs: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            enable_cache: false,
            cache_size: 64,
            cache_ttl_secs: 300,
        }
    }
}

impl PredictorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the artifact cache with the given bounds
    pub fn with_cache(mut self, size: usize, ttl_secs: u64) -> Self {
        self.enable_cache = true;
        self.cache_size = size;
        self.cache_ttl_secs = ttl_secs;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
