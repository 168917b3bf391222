//! The persisted model bundle and its metadata record

use crate::error::{ForecastError, Result};
use crate::features::{FeatureRecord, FEATURE_ORDER};
use crate::preprocessing::CategoricalEncoders;
use crate::training::RandomForest;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Fitted forest plus the encoders captured at training time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: RandomForest,
    pub encoders: CategoricalEncoders,
}

impl ModelArtifact {
    pub fn new(model: RandomForest, encoders: CategoricalEncoders) -> Self {
        Self { model, encoders }
    }

    /// Encode a record into the feature vector layout used at training time
    pub fn encode(&self, record: &FeatureRecord) -> Result<[f64; 6]> {
        let [day, meal, weather] = self.encoders.encode_record(record)?;
        Ok([
            day as f64,
            meal as f64,
            f64::from(record.is_holiday),
            weather as f64,
            record.temperature,
            record.sales_last_30d_avg,
        ])
    }

    /// Raw model output for an already encoded vector
    pub fn predict_encoded(&self, row: &[f64; 6]) -> Result<f64> {
        let x = Array2::from_shape_vec((1, FEATURE_ORDER.len()), row.to_vec())?;
        let prediction = self.model.predict(&x)?;
        prediction
            .first()
            .copied()
            .ok_or_else(|| ForecastError::ShapeError {
                expected: "1 prediction".to_string(),
                actual: "0 predictions".to_string(),
            })
    }

    /// Raw model output for a feature record
    pub fn predict(&self, record: &FeatureRecord) -> Result<f64> {
        let row = self.encode(record)?;
        self.predict_encoded(&row)
    }
}

/// Human-readable record stored next to the model blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub menu_item: String,
    pub trained_at: DateTime<Utc>,
    pub rows_used: usize,
}

impl ArtifactMetadata {
    pub fn new(menu_item: impl Into<String>, rows_used: usize) -> Self {
        Self {
            menu_item: menu_item.into(),
            trained_at: Utc::now(),
            rows_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::LabelEncoder;
    use ndarray::array;

    fn tiny_artifact() -> ModelArtifact {
        let mut encoders = CategoricalEncoders::new();
        encoders.insert(LabelEncoder::from_values("day_of_week", ["Monday", "Tuesday"]));
        encoders.insert(LabelEncoder::from_values("meal_period", ["dinner", "lunch"]));
        encoders.insert(LabelEncoder::from_values("weather", ["rainy", "sunny"]));

        let x = array![
            [0.0, 1.0, 0.0, 1.0, 20.0, 40.0],
            [1.0, 0.0, 1.0, 0.0, 30.0, 80.0],
            [0.0, 0.0, 0.0, 0.0, 25.0, 60.0],
        ];
        let y = array![40.0, 80.0, 60.0];
        let mut model = RandomForest::new_regressor(5).with_random_state(1);
        model.fit(&x, &y).unwrap();

        ModelArtifact::new(model, encoders)
    }

    fn record(weather: &str) -> FeatureRecord {
        FeatureRecord {
            day_of_week: "Tuesday".to_string(),
            meal_period: "lunch".to_string(),
            is_holiday: 1,
            weather: weather.to_string(),
            temperature: 28.0,
            sales_last_30d_avg: 75.0,
        }
    }

    #[test]
    fn test_encode_layout() {
        let artifact = tiny_artifact();
        let row = artifact.encode(&record("sunny")).unwrap();
        assert_eq!(row, [1.0, 1.0, 1.0, 1.0, 28.0, 75.0]);
    }

    #[test]
    fn test_encode_unknown_category() {
        let artifact = tiny_artifact();
        assert!(matches!(
            artifact.encode(&record("snowy")),
            Err(ForecastError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn test_predict_in_range() {
        let artifact = tiny_artifact();
        let value = artifact.predict(&record("rainy")).unwrap();
        assert!((40.0..=80.0).contains(&value));
    }

    #[test]
    fn test_metadata_json_shape() {
        let meta = ArtifactMetadata::new("Masala Dosa", 40);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["menu_item"], "Masala Dosa");
        assert_eq!(json["rows_used"], 40);
        assert!(json["trained_at"].is_string());
    }
}
