//! Column validation and feature matrix assembly

use crate::error::{ForecastError, Result};
use crate::features::{
    CATEGORICAL_FEATURES, DATE, DATE_FORMAT, FEATURE_ORDER, NUMERIC_FEATURES, TARGET,
};
use super::encoder::CategoricalEncoders;
use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Number of most recent rows averaged into `sales_last_30d_avg`
pub const TRAILING_WINDOW: usize = 30;

fn required_columns() -> impl Iterator<Item = &'static str> {
    FEATURE_ORDER.into_iter().chain(std::iter::once(TARGET))
}

/// Validate a raw sales table and reduce it to the training columns
///
/// `Date` and any unknown columns are dropped. Numeric columns are coerced to
/// `Float64`; a value that does not parse, or an empty cell, fails the whole
/// table.
pub fn prepare_frame(df: &DataFrame) -> Result<DataFrame> {
    let missing: Vec<&str> = required_columns()
        .filter(|name| df.column(name).is_err())
        .collect();

    if !missing.is_empty() {
        return Err(ForecastError::MalformedDataset(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    if df.column(DATE).is_ok() {
        tracing::debug!(column = DATE, "Dropping date column before fitting");
    }

    let mut frame = df.select(required_columns())?;

    for name in NUMERIC_FEATURES.into_iter().chain(std::iter::once(TARGET)) {
        let values = numeric_values(&frame, name)?;
        frame.with_column(Series::new(name.into(), values))?;
    }

    Ok(frame)
}

/// Encode a prepared frame into a row-major matrix in `FEATURE_ORDER`
pub fn feature_matrix(frame: &DataFrame, encoders: &CategoricalEncoders) -> Result<Array2<f64>> {
    let n_rows = frame.height();

    let col_data: Vec<Vec<f64>> = FEATURE_ORDER
        .iter()
        .map(|&name| {
            if CATEGORICAL_FEATURES.contains(&name) {
                let encoder = encoders.get(name).ok_or_else(|| {
                    ForecastError::MalformedDataset(format!("no encoder fitted for `{}`", name))
                })?;
                encoder.transform_series(column(frame, name)?)
            } else {
                numeric_values(frame, name)
            }
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, FEATURE_ORDER.len()), |(r, c)| col_refs[c][r]))
}

/// Regression target of a prepared frame
pub fn target_vector(frame: &DataFrame) -> Result<Array1<f64>> {
    Ok(Array1::from_vec(numeric_values(frame, TARGET)?))
}

/// Mean servings over the `window` most recent rows, ordered by `Date`
///
/// Tables without a `Date` or target column yield 0.0, as do empty tables.
pub fn trailing_average(df: &DataFrame, window: usize) -> Result<f64> {
    if df.column(DATE).is_err() || df.column(TARGET).is_err() || df.height() == 0 {
        return Ok(0.0);
    }

    let dates = column(df, DATE)?.str().map_err(|_| {
        ForecastError::MalformedDataset(format!("`{}` must be text in DD-MM-YYYY form", DATE))
    })?;
    let servings = numeric_values(df, TARGET)?;

    let mut history: Vec<(NaiveDate, f64)> = dates
        .into_iter()
        .zip(servings)
        .map(|(date, value)| {
            let raw = date.ok_or_else(|| {
                ForecastError::MalformedDataset(format!("empty `{}` value", DATE))
            })?;
            let parsed = NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
                ForecastError::MalformedDataset(format!("cannot parse date `{}`", raw))
            })?;
            Ok((parsed, value))
        })
        .collect::<Result<_>>()?;

    // Stable sort keeps upload order for rows sharing a date
    history.sort_by_key(|(date, _)| *date);

    let recent = &history[history.len().saturating_sub(window)..];
    if recent.is_empty() {
        return Ok(0.0);
    }
    Ok(recent.iter().map(|(_, v)| v).sum::<f64>() / recent.len() as f64)
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| ForecastError::MalformedDataset(format!("missing column `{}`", name)))
}

fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = column(df, name)?;
    let cast = series.strict_cast(&DataType::Float64).map_err(|_| {
        ForecastError::MalformedDataset(format!(
            "column `{}` must be numeric, found {}",
            name,
            series.dtype()
        ))
    })?;
    let ca = cast.f64()?;

    if ca.null_count() > 0 {
        return Err(ForecastError::MalformedDataset(format!(
            "column `{}` has {} missing or non-numeric values",
            name,
            ca.null_count()
        )));
    }

    Ok(ca.into_no_null_iter().collect())
}
