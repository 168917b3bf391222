//! Utility functions and types

pub mod data_loader;
pub mod uploads;

pub use data_loader::DataLoader;
pub use uploads::UploadStore;

use std::time::{Duration, Instant};

/// Simple wall-clock timer
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}
