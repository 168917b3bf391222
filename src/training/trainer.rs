//! Fits and publishes one menu item's demand model

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use super::config::TrainerConfig;
use super::metrics::RegressionMetrics;
use crate::error::{ForecastError, Result};
use crate::export::{ArtifactHandle, ArtifactMetadata, ArtifactStore, ModelArtifact};
use crate::features::FEATURE_ORDER;
use crate::preprocessing::{feature_matrix, prepare_frame, target_vector, CategoricalEncoders};
use crate::utils::{DataLoader, Timer};

/// Importance of one input feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub metadata: ArtifactMetadata,
    /// In `FEATURE_ORDER`
    pub feature_importances: Vec<FeatureImportance>,
    pub train_mae: f64,
    pub train_r2: f64,
    pub elapsed_secs: f64,
}

/// Trains per-item forests
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
    loader: DataLoader,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            loader: DataLoader::new(),
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit encoders and forest without touching storage
    pub fn fit(&self, menu_item: &str, df: &DataFrame) -> Result<(ModelArtifact, TrainingReport)> {
        let timer = Timer::start();

        let frame = prepare_frame(df)?;
        let rows = frame.height();
        let required = self.config.min_rows.max(1);
        if rows < required {
            return Err(ForecastError::InsufficientData {
                required,
                actual: rows,
            });
        }

        let encoders = CategoricalEncoders::fit(&frame)?;
        let x = feature_matrix(&frame, &encoders)?;
        let y = target_vector(&frame)?;
        debug!(
            menu_item,
            rows,
            vocab = ?encoders.fields().map(|f| (f, encoders.get(f).map_or(0, |e| e.len()))).collect::<Vec<_>>(),
            "Fitting forest"
        );

        let mut model = self.config.build_forest();
        model.fit(&x, &y)?;

        let metrics = RegressionMetrics::compute(&y, &model.predict(&x)?);
        let feature_importances = model
            .feature_importances()
            .map(|imp| {
                FEATURE_ORDER
                    .iter()
                    .zip(imp.iter())
                    .map(|(name, &importance)| FeatureImportance {
                        feature: name.to_string(),
                        importance,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let report = TrainingReport {
            metadata: ArtifactMetadata::new(menu_item, rows),
            feature_importances,
            train_mae: metrics.mae,
            train_r2: metrics.r2,
            elapsed_secs: timer.elapsed_secs(),
        };

        Ok((ModelArtifact::new(model, encoders), report))
    }

    /// Fit on an in-memory table and publish to `handle`
    pub fn train_frame(
        &self,
        store: &dyn ArtifactStore,
        handle: &ArtifactHandle,
        df: &DataFrame,
    ) -> Result<TrainingReport> {
        let (artifact, report) = self.fit(&handle.key.menu_item, df)?;
        store.publish(handle, &artifact, &report.metadata)?;

        info!(
            key = %handle.key,
            rows = report.metadata.rows_used,
            trees = artifact.model.n_trees(),
            train_mae = report.train_mae,
            train_r2 = report.train_r2,
            elapsed_secs = report.elapsed_secs,
            "Model trained"
        );
        Ok(report)
    }

    /// Fit on a CSV file
    pub fn train_csv(
        &self,
        store: &dyn ArtifactStore,
        handle: &ArtifactHandle,
        path: impl AsRef<Path>,
    ) -> Result<TrainingReport> {
        let df = self.loader.load_csv(path)?;
        self.train_frame(store, handle, &df)
    }

    /// Fit on CSV content held in memory
    pub fn train_csv_bytes(
        &self,
        store: &dyn ArtifactStore,
        handle: &ArtifactHandle,
        bytes: &[u8],
    ) -> Result<TrainingReport> {
        let df = self.loader.load_csv_bytes(bytes)?;
        self.train_frame(store, handle, &df)
    }
}
