//! Feature schema and the typed feature record used at prediction time

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DAY_OF_WEEK: &str = "day_of_week";
pub const MEAL_PERIOD: &str = "meal_period";
pub const IS_HOLIDAY: &str = "is_holiday";
pub const WEATHER: &str = "weather";
pub const TEMPERATURE: &str = "temperature";
pub const SALES_LAST_30D_AVG: &str = "sales_last_30d_avg";

/// Regression target column
pub const TARGET: &str = "no_of_servings";
/// Optional ordering column, dropped before fitting
pub const DATE: &str = "Date";
/// Format of the `Date` column in uploaded sales files
pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Column order of the feature matrix. Training and inference must agree.
pub const FEATURE_ORDER: [&str; 6] = [
    DAY_OF_WEEK,
    MEAL_PERIOD,
    IS_HOLIDAY,
    WEATHER,
    TEMPERATURE,
    SALES_LAST_30D_AVG,
];

/// Columns that go through a label encoder
pub const CATEGORICAL_FEATURES: [&str; 3] = [DAY_OF_WEEK, MEAL_PERIOD, WEATHER];

/// Numeric feature columns, passed through as floats
pub const NUMERIC_FEATURES: [&str; 3] = [IS_HOLIDAY, TEMPERATURE, SALES_LAST_30D_AVG];

/// Temperature used when a caller does not supply one
pub const DEFAULT_TEMPERATURE: f64 = 25.0;

/// One fully validated feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub day_of_week: String,
    pub meal_period: String,
    pub is_holiday: u8,
    pub weather: String,
    pub temperature: f64,
    pub sales_last_30d_avg: f64,
}

impl FeatureRecord {
    /// Build a record whose `day_of_week` is derived from a calendar date
    pub fn for_date(
        date: NaiveDate,
        meal_period: impl Into<String>,
        is_holiday: bool,
        weather: impl Into<String>,
        temperature: f64,
        sales_last_30d_avg: f64,
    ) -> Self {
        Self {
            day_of_week: weekday_name(date),
            meal_period: meal_period.into(),
            is_holiday: u8::from(is_holiday),
            weather: weather.into(),
            temperature,
            sales_last_30d_avg,
        }
    }

    /// Reject values the model cannot be fed: non-finite numbers or a flag outside 0/1
    pub fn validate(&self) -> Result<()> {
        if self.is_holiday > 1 {
            return Err(invalid(IS_HOLIDAY, "expected 0 or 1"));
        }
        for (field, value) in [
            (TEMPERATURE, self.temperature),
            (SALES_LAST_30D_AVG, self.sales_last_30d_avg),
        ] {
            if !value.is_finite() {
                return Err(invalid(field, "value must be finite"));
            }
        }
        Ok(())
    }

    /// Value of a categorical feature by column name
    pub fn categorical(&self, field: &str) -> Option<&str> {
        match field {
            DAY_OF_WEEK => Some(self.day_of_week.as_str()),
            MEAL_PERIOD => Some(self.meal_period.as_str()),
            WEATHER => Some(self.weather.as_str()),
            _ => None,
        }
    }
}

/// Full English weekday name, e.g. `Monday`
pub fn weekday_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Parse a calendar date given as `YYYY-MM-DD` or `DD-MM-YYYY`
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, DATE_FORMAT))
        .map_err(|_| invalid("date", &format!("`{}` is not a YYYY-MM-DD date", value)))
}

/// A loosely typed scalar, as it arrives from forms or JSON bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FeatureValue {
    fn as_text(&self, field: &str) -> Result<String> {
        match self {
            FeatureValue::Text(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            FeatureValue::Text(_) => Err(invalid(field, "value is empty")),
            other => Err(invalid(field, &format!("expected a category name, got {:?}", other))),
        }
    }

    fn as_float(&self, field: &str) -> Result<f64> {
        let value = match self {
            FeatureValue::Number(n) => *n,
            FeatureValue::Bool(b) => f64::from(u8::from(*b)),
            FeatureValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| invalid(field, &format!("`{}` is not a number", s)))?,
        };
        if !value.is_finite() {
            return Err(invalid(field, "value must be finite"));
        }
        Ok(value)
    }

    fn as_flag(&self, field: &str) -> Result<u8> {
        match self {
            FeatureValue::Bool(b) => Ok(u8::from(*b)),
            FeatureValue::Text(s) if s.eq_ignore_ascii_case("true") => Ok(1),
            FeatureValue::Text(s) if s.eq_ignore_ascii_case("false") => Ok(0),
            other => {
                let value = other.as_float(field)?;
                if value.fract() != 0.0 {
                    return Err(invalid(field, "expected an integer flag"));
                }
                match value as i64 {
                    0 => Ok(0),
                    1 => Ok(1),
                    n => Err(invalid(field, &format!("expected 0 or 1, got {}", n))),
                }
            }
        }
    }
}

/// Unvalidated feature bag; every key must be present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFeatures {
    pub day_of_week: Option<FeatureValue>,
    pub meal_period: Option<FeatureValue>,
    pub is_holiday: Option<FeatureValue>,
    pub weather: Option<FeatureValue>,
    pub temperature: Option<FeatureValue>,
    pub sales_last_30d_avg: Option<FeatureValue>,
}

impl TryFrom<RawFeatures> for FeatureRecord {
    type Error = ForecastError;

    fn try_from(raw: RawFeatures) -> Result<Self> {
        Ok(Self {
            day_of_week: required(&raw.day_of_week, DAY_OF_WEEK)?.as_text(DAY_OF_WEEK)?,
            meal_period: required(&raw.meal_period, MEAL_PERIOD)?.as_text(MEAL_PERIOD)?,
            is_holiday: required(&raw.is_holiday, IS_HOLIDAY)?.as_flag(IS_HOLIDAY)?,
            weather: required(&raw.weather, WEATHER)?.as_text(WEATHER)?,
            temperature: required(&raw.temperature, TEMPERATURE)?.as_float(TEMPERATURE)?,
            sales_last_30d_avg: required(&raw.sales_last_30d_avg, SALES_LAST_30D_AVG)?
                .as_float(SALES_LAST_30D_AVG)?,
        })
    }
}

fn required<'a>(value: &'a Option<FeatureValue>, field: &str) -> Result<&'a FeatureValue> {
    value.as_ref().ok_or_else(|| invalid(field, "missing"))
}

fn invalid(field: &str, reason: &str) -> ForecastError {
    ForecastError::InvalidFeature {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_features() -> RawFeatures {
        RawFeatures {
            day_of_week: Some(FeatureValue::Text("Monday".into())),
            meal_period: Some(FeatureValue::Text("lunch".into())),
            is_holiday: Some(FeatureValue::Text("1".into())),
            weather: Some(FeatureValue::Text("sunny".into())),
            temperature: Some(FeatureValue::Text("27.5".into())),
            sales_last_30d_avg: Some(FeatureValue::Number(88.0)),
        }
    }

    #[test]
    fn test_validate_rejects_non_finite_values() {
        let mut record = FeatureRecord::try_from(raw_features()).unwrap();
        assert!(record.validate().is_ok());

        record.temperature = f64::NAN;
        assert!(matches!(
            record.validate(),
            Err(ForecastError::InvalidFeature { ref field, .. }) if field == "temperature"
        ));

        record.temperature = 20.0;
        record.sales_last_30d_avg = f64::INFINITY;
        assert!(matches!(
            record.validate(),
            Err(ForecastError::InvalidFeature { ref field, .. }) if field == "sales_last_30d_avg"
        ));

        record.sales_last_30d_avg = 50.0;
        record.is_holiday = 2;
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_feature_order_is_fixed() {
        assert_eq!(
            FEATURE_ORDER,
            ["day_of_week", "meal_period", "is_holiday", "weather", "temperature", "sales_last_30d_avg"]
        );
    }

    #[test]
    fn test_raw_features_coerce() {
        let record = FeatureRecord::try_from(raw_features()).unwrap();
        assert_eq!(record.is_holiday, 1);
        assert_eq!(record.temperature, 27.5);
        assert_eq!(record.sales_last_30d_avg, 88.0);
        assert_eq!(record.categorical(WEATHER), Some("sunny"));
    }

    #[test]
    fn test_missing_key_rejected() {
        let mut raw = raw_features();
        raw.weather = None;
        let err = FeatureRecord::try_from(raw).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidFeature { ref field, .. } if field == "weather"));
    }

    #[test]
    fn test_non_numeric_temperature_rejected() {
        let mut raw = raw_features();
        raw.temperature = Some(FeatureValue::Text("warm".into()));
        assert!(FeatureRecord::try_from(raw).is_err());
    }

    #[test]
    fn test_holiday_flag_range() {
        let mut raw = raw_features();
        raw.is_holiday = Some(FeatureValue::Number(3.0));
        assert!(FeatureRecord::try_from(raw).is_err());

        let mut raw = raw_features();
        raw.is_holiday = Some(FeatureValue::Bool(false));
        assert_eq!(FeatureRecord::try_from(raw).unwrap().is_holiday, 0);
    }

    #[test]
    fn test_for_date_derives_weekday() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        let record = FeatureRecord::for_date(date, "dinner", false, "rainy", 21.0, 40.0);
        assert_eq!(record.day_of_week, "Monday");
        assert_eq!(record.is_holiday, 0);
    }

    #[test]
    fn test_untagged_json() {
        let raw: RawFeatures = serde_json::from_str(
            r#"{"day_of_week":"Friday","meal_period":"dinner","is_holiday":true,
                "weather":"rainy","temperature":18,"sales_last_30d_avg":"61.5"}"#,
        )
        .unwrap();
        let record = FeatureRecord::try_from(raw).unwrap();
        assert_eq!(record.is_holiday, 1);
        assert_eq!(record.sales_last_30d_avg, 61.5);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        assert_eq!(parse_date("2024-03-18").unwrap(), expected);
        assert_eq!(parse_date("18-03-2024").unwrap(), expected);
        assert!(matches!(
            parse_date("March 18"),
            Err(ForecastError::InvalidFeature { .. })
        ));
    }
}
