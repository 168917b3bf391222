//! Serving-count prediction from a published artifact

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::config::PredictorConfig;
use crate::cache::{ArtifactCache, CacheStats};
use crate::error::{ForecastError, Result};
use crate::export::{ArtifactHandle, ArtifactStore, ModelArtifact};
use crate::features::{FeatureRecord, RawFeatures};

/// Forecast for one menu item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// `<menu_item>_<unix seconds>`
    pub id: String,
    pub menu_item: String,
    /// Expected servings
    pub demand: u64,
}

/// External rendering of a prediction outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Ok(Prediction),
    Error { error: String },
}

impl From<Result<Prediction>> for PredictionResponse {
    fn from(result: Result<Prediction>) -> Self {
        match result {
            Ok(prediction) => PredictionResponse::Ok(prediction),
            Err(e) => PredictionResponse::Error {
                error: e.to_string(),
            },
        }
    }
}

/// Truncate the ensemble mean toward zero; negative outputs become 0
pub fn to_demand(raw: f64) -> u64 {
    if raw.is_finite() && raw > 0.0 {
        raw.trunc() as u64
    } else {
        0
    }
}

/// Loads artifacts through a store and scores feature records
pub struct Predictor {
    store: Arc<dyn ArtifactStore>,
    cache: Option<ArtifactCache>,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("cache", &self.cache.as_ref().map(|c| c.stats()))
            .finish()
    }
}

impl Predictor {
    /// Predictor without an artifact cache
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self::with_config(store, PredictorConfig::default())
    }

    pub fn with_config(store: Arc<dyn ArtifactStore>, config: PredictorConfig) -> Self {
        let cache = config
            .enable_cache
            .then(|| ArtifactCache::new(config.cache_size, config.cache_ttl()));
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|c| c.stats())
    }

    fn artifact(&self, handle: &ArtifactHandle) -> Result<Arc<ModelArtifact>> {
        let Some(cache) = &self.cache else {
            return Ok(Arc::new(self.store.load(handle)?));
        };

        // Without metadata there is no revision to validate a cached copy against
        let revision = match self.store.metadata(handle) {
            Ok(meta) => meta.trained_at,
            Err(ForecastError::NotTrained { .. }) => return Ok(Arc::new(self.store.load(handle)?)),
            Err(e) => return Err(e),
        };

        if let Some(artifact) = cache.get(&handle.key, revision) {
            return Ok(artifact);
        }

        let artifact = Arc::new(self.store.load(handle)?);
        cache.insert(handle.key.clone(), revision, artifact.clone());
        debug!(key = %handle.key, "Artifact cached");
        Ok(artifact)
    }

    /// Predict servings for one feature record
    pub fn predict(
        &self,
        restaurant_id: &str,
        menu_item: &str,
        features: &FeatureRecord,
    ) -> Result<Prediction> {
        features.validate()?;
        let handle = self.store.locate(restaurant_id, menu_item)?;
        let artifact = self.artifact(&handle)?;
        let raw = artifact.predict(features)?;

        debug!(key = %handle.key, raw, "Prediction computed");

        Ok(Prediction {
            id: format!("{}_{}", menu_item, Utc::now().timestamp()),
            menu_item: menu_item.to_string(),
            demand: to_demand(raw),
        })
    }

    /// Validate an untyped feature bag, then predict
    pub fn predict_raw(
        &self,
        restaurant_id: &str,
        menu_item: &str,
        features: RawFeatures,
    ) -> Result<Prediction> {
        let record = FeatureRecord::try_from(features)?;
        self.predict(restaurant_id, menu_item, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ArtifactMetadata, MemoryArtifactStore};
    use crate::preprocessing::{CategoricalEncoders, LabelEncoder};
    use crate::training::RandomForest;
    use ndarray::array;

    fn publish(store: &MemoryArtifactStore, item: &str, target: f64) {
        let mut encoders = CategoricalEncoders::new();
        encoders.insert(LabelEncoder::from_values("day_of_week", ["Monday"]));
        encoders.insert(LabelEncoder::from_values("meal_period", ["lunch"]));
        encoders.insert(LabelEncoder::from_values("weather", ["sunny"]));
        let mut model = RandomForest::new_regressor(3).with_random_state(3);
        model
            .fit(
                &array![[0.0, 0.0, 0.0, 0.0, 20.0, 10.0], [0.0, 0.0, 1.0, 0.0, 30.0, 10.0]],
                &array![target, target],
            )
            .unwrap();
        let handle = store.locate("r1", item).unwrap();
        store
            .publish(&handle, &ModelArtifact::new(model, encoders), &ArtifactMetadata::new(item, 2))
            .unwrap();
    }

    fn record() -> FeatureRecord {
        FeatureRecord {
            day_of_week: "Monday".to_string(),
            meal_period: "lunch".to_string(),
            is_holiday: 0,
            weather: "sunny".to_string(),
            temperature: 22.0,
            sales_last_30d_avg: 10.0,
        }
    }

    #[test]
    fn test_to_demand() {
        assert_eq!(to_demand(41.99), 41);
        assert_eq!(to_demand(0.4), 0);
        assert_eq!(to_demand(-3.2), 0);
        assert_eq!(to_demand(f64::NAN), 0);
    }

    #[test]
    fn test_predict_truncates() {
        let store = Arc::new(MemoryArtifactStore::new());
        publish(&store, "Idli", 57.8);
        let predictor = Predictor::new(store);

        let prediction = predictor.predict("r1", "Idli", &record()).unwrap();
        assert_eq!(prediction.demand, 57);
        assert_eq!(prediction.menu_item, "Idli");
        assert!(prediction.id.starts_with("Idli_"));
    }

    #[test]
    fn test_non_finite_input_rejected_before_lookup() {
        let predictor = Predictor::new(Arc::new(MemoryArtifactStore::new()));
        let mut features = record();
        features.temperature = f64::NAN;

        // Untrained item, but the bad value is reported first
        assert!(matches!(
            predictor.predict("r1", "Idli", &features),
            Err(ForecastError::InvalidFeature { ref field, .. }) if field == "temperature"
        ));
    }

    #[test]
    fn test_cached_predictor_sees_retrain() {
        let store = Arc::new(MemoryArtifactStore::new());
        publish(&store, "Idli", 30.0);
        let predictor =
            Predictor::with_config(store.clone(), PredictorConfig::new().with_cache(4, 60));

        assert_eq!(predictor.predict("r1", "Idli", &record()).unwrap().demand, 30);
        assert_eq!(predictor.predict("r1", "Idli", &record()).unwrap().demand, 30);

        std::thread::sleep(std::time::Duration::from_millis(2));
        publish(&store, "Idli", 90.0);
        assert_eq!(predictor.predict("r1", "Idli", &record()).unwrap().demand, 90);

        let stats = predictor.cache_stats().unwrap();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_response_rendering() {
        let err: Result<Prediction> = Err(ForecastError::InvalidCategory {
            field: "weather".to_string(),
            value: "snowy".to_string(),
        });
        let json = serde_json::to_value(PredictionResponse::from(err)).unwrap();
        assert_eq!(json["error"], "invalid input value `snowy` for `weather`");

        let ok = PredictionResponse::Ok(Prediction {
            id: "Idli_1".to_string(),
            menu_item: "Idli".to_string(),
            demand: 12,
        });
        let json = serde_json::to_value(ok).unwrap();
        assert_eq!(json["demand"], 12);
        assert!(json.get("error").is_none());
    }
}
