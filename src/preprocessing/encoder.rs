//! Label encoding for categorical feature columns

use crate::error::{ForecastError, Result};
use crate::features::{FeatureRecord, CATEGORICAL_FEATURES};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bijection from the category strings seen during fitting to `0..n`
///
/// Classes are kept sorted, so codes follow lexical order of the vocabulary.
/// Codes only mean something next to the model they were fitted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    field: String,
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit over the distinct trimmed values of a string column; blanks are rejected
    pub fn fit(field: &str, series: &Series) -> Result<Self> {
        let ca = series.str().map_err(|_| {
            ForecastError::MalformedDataset(format!(
                "column `{}` must hold category names, found {}",
                field,
                series.dtype()
            ))
        })?;

        let empty = ca
            .into_iter()
            .filter(|v| v.map_or(true, |v| v.trim().is_empty()))
            .count();
        if empty > 0 {
            return Err(ForecastError::MalformedDataset(format!(
                "column `{}` has {} empty values",
                field, empty
            )));
        }

        Ok(Self::from_values(field, ca.into_iter().flatten()))
    }

    /// Fit from an iterator of category names, trimmed the same way request values are
    pub fn from_values<'a>(field: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = values.into_iter().map(|v| v.trim().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self {
            field: field.to_string(),
            classes,
        }
    }

    /// Encode one value; unseen values are rejected
    pub fn transform(&self, value: &str) -> Result<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .map_err(|_| ForecastError::InvalidCategory {
                field: self.field.clone(),
                value: value.to_string(),
            })
    }

    /// Encode a whole column into float codes
    pub fn transform_series(&self, series: &Series) -> Result<Vec<f64>> {
        let ca = series
            .str()
            .map_err(|e| ForecastError::MalformedDataset(e.to_string()))?;

        ca.into_iter()
            .map(|v| {
                let v = v.ok_or_else(|| {
                    ForecastError::MalformedDataset(format!("null value in `{}`", self.field))
                })?;
                self.transform(v.trim()).map(|code| code as f64)
            })
            .collect()
    }

    /// Category name for a code
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(|s| s.as_str())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// The fitted encoders of one artifact, keyed by categorical column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoders {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl CategoricalEncoders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit a fresh encoder for every categorical column of the frame
    pub fn fit(df: &DataFrame) -> Result<Self> {
        let mut encoders = BTreeMap::new();
        for field in CATEGORICAL_FEATURES {
            let column = df
                .column(field)
                .map_err(|_| ForecastError::MalformedDataset(format!("missing column `{}`", field)))?;
            let encoder = LabelEncoder::fit(field, column.as_materialized_series())?;
            encoders.insert(field.to_string(), encoder);
        }
        Ok(Self { encoders })
    }

    pub fn insert(&mut self, encoder: LabelEncoder) {
        self.encoders.insert(encoder.field().to_string(), encoder);
    }

    pub fn get(&self, field: &str) -> Option<&LabelEncoder> {
        self.encoders.get(field)
    }

    /// Encode a single categorical value with the stored encoder for `field`
    pub fn encode(&self, field: &str, value: &str) -> Result<usize> {
        self.encoders
            .get(field)
            .ok_or_else(|| ForecastError::Storage(format!("artifact has no encoder for `{}`", field)))?
            .transform(value)
    }

    /// Encode the categorical fields of a record, in `CATEGORICAL_FEATURES` order
    pub fn encode_record(&self, record: &FeatureRecord) -> Result<[usize; 3]> {
        let mut codes = [0usize; 3];
        for (slot, field) in codes.iter_mut().zip(CATEGORICAL_FEATURES) {
            // categorical() is total over CATEGORICAL_FEATURES
            let value = record.categorical(field).unwrap_or_default();
            *slot = self.encode(field, value)?;
        }
        Ok(codes)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}
