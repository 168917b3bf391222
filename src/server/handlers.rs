//! HTTP request handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    Json,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::export::{ArtifactHandle, ArtifactStore};
use crate::features::{parse_date, weekday_name, FeatureValue, RawFeatures, DEFAULT_TEMPERATURE};
use crate::inference::Prediction;

use super::error::{Result, ServerError};
use super::state::{AppState, JobStatus};

// ============================================================================
// System
// ============================================================================

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Training
// ============================================================================

/// Accept a CSV upload for one menu item and train it in the background
pub async fn start_training(
    State(state): State<Arc<AppState>>,
    Path((restaurant_id, menu_item)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let handle = state.store.locate(&restaurant_id, &menu_item)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("data.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        info!(file = %file_name, bytes = data.len(), key = %handle.key, "Received training upload");
        upload = Some(data);
        break;
    }

    let data = upload.ok_or_else(|| ServerError::BadRequest("No file uploaded".to_string()))?;
    if data.is_empty() {
        return Err(ServerError::BadRequest("Uploaded file is empty".to_string()));
    }

    state.uploads.save(&restaurant_id, &menu_item, &data)?;
    let job_id = spawn_training_job(&state, handle, data).await;

    Ok(Json(serde_json::json!({
        "success": true,
        "job_id": job_id,
        "message": "Training started",
    })))
}

/// Accept several menu items with one CSV each and train them all
///
/// Items arrive as repeated `menu_items[]` text fields and files as repeated
/// `sales_csvs[]` fields, paired by position.
pub async fn start_batch_training(
    State(state): State<Arc<AppState>>,
    Path(restaurant_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let mut menu_items = Vec::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("menu_items[]") => menu_items.push(
                field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.to_string()))?,
            ),
            Some("sales_csvs[]") => uploads.push(
                field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(e.to_string()))?,
            ),
            _ => continue,
        }
    }

    if menu_items.len() != uploads.len() {
        return Err(ServerError::BadRequest(format!(
            "Mismatch in menu items and CSVs: {} items, {} files",
            menu_items.len(),
            uploads.len()
        )));
    }
    if menu_items.is_empty() {
        return Err(ServerError::BadRequest("No menu items submitted".to_string()));
    }

    // Reject the whole batch before anything is stored
    let mut handles = Vec::with_capacity(menu_items.len());
    for (menu_item, data) in menu_items.iter().zip(&uploads) {
        if data.is_empty() {
            return Err(ServerError::BadRequest(format!(
                "Uploaded file for `{}` is empty",
                menu_item
            )));
        }
        handles.push(state.store.locate(&restaurant_id, menu_item)?);
    }

    let mut jobs = Vec::with_capacity(handles.len());
    for (handle, data) in handles.into_iter().zip(uploads) {
        state.uploads.save(&restaurant_id, &handle.key.menu_item, &data)?;
        let menu_item = handle.key.menu_item.clone();
        let job_id = spawn_training_job(&state, handle, data).await;
        jobs.push(serde_json::json!({ "menu_item": menu_item, "job_id": job_id }));
    }

    info!(restaurant_id = %restaurant_id, items = jobs.len(), "Batch training started");
    Ok(Json(serde_json::json!({
        "success": true,
        "jobs": jobs,
        "message": "Training started",
    })))
}

/// Register a job and fit it on the blocking pool
async fn spawn_training_job(state: &Arc<AppState>, handle: ArtifactHandle, data: Bytes) -> String {
    let job_id = state
        .create_job(&handle.key.restaurant_id, &handle.key.menu_item)
        .await;

    let state_clone = state.clone();
    let job = job_id.clone();
    tokio::spawn(async move {
        state_clone.set_job_status(&job, JobStatus::Running).await;

        let worker_state = state_clone.clone();
        let result = tokio::task::spawn_blocking(move || {
            worker_state
                .trainer
                .train_csv_bytes(worker_state.store.as_ref(), &handle, &data)
        })
        .await;

        let status = match result {
            Ok(Ok(report)) => {
                info!(job_id = %job, rows = report.metadata.rows_used, "Training job completed");
                JobStatus::Completed { report }
            }
            Ok(Err(e)) => {
                error!(job_id = %job, kind = e.kind(), error = %e, "Training job failed");
                JobStatus::Failed { error: e.to_string() }
            }
            Err(e) => {
                error!(job_id = %job, error = %e, "Training task panicked");
                JobStatus::Failed { error: "training task aborted".to_string() }
            }
        };
        state_clone.set_job_status(&job, status).await;
    });

    job_id
}

pub async fn get_training_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let jobs = state.jobs.read().await;

    let job = jobs
        .get(&job_id)
        .ok_or_else(|| ServerError::NotFound(format!("Job not found: {}", job_id)))?;

    Ok(Json(serde_json::json!({
        "job_id": job.id,
        "restaurant_id": job.restaurant_id,
        "menu_item": job.menu_item,
        "status": job.status,
        "created_at": job.created_at.to_rfc3339(),
        "finished_at": job.finished_at.map(|at| at.to_rfc3339()),
    })))
}

// ============================================================================
// Models
// ============================================================================

pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Path(restaurant_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let items = state.store.list_trained(&restaurant_id)?;
    Ok(Json(serde_json::json!({
        "restaurant_id": restaurant_id,
        "menu_items": items,
    })))
}

pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path((restaurant_id, menu_item)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>> {
    let handle = state.store.locate(&restaurant_id, &menu_item)?;
    let metadata = state.store.metadata(&handle)?;
    Ok(Json(serde_json::to_value(metadata).map_err(crate::error::ForecastError::from)?))
}

// ============================================================================
// Inference
// ============================================================================

/// Prediction form. `date` wins over `day_of_week`; missing `temperature`
/// uses the default and a missing average is computed from the last upload.
#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    pub date: Option<String>,
    pub day_of_week: Option<FeatureValue>,
    pub meal_period: Option<FeatureValue>,
    pub is_holiday: Option<FeatureValue>,
    pub weather: Option<FeatureValue>,
    pub temperature: Option<FeatureValue>,
    pub sales_last_30d_avg: Option<FeatureValue>,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Path((restaurant_id, menu_item)): Path<(String, String)>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<Prediction>> {
    let day_of_week = match &request.date {
        Some(date) => Some(FeatureValue::Text(weekday_name(parse_date(date)?))),
        None => request.day_of_week,
    };

    let worker_state = state.clone();
    let prediction = tokio::task::spawn_blocking(move || {
        let sales_last_30d_avg = match request.sales_last_30d_avg {
            Some(avg) => avg,
            None => FeatureValue::Number(
                worker_state
                    .uploads
                    .trailing_average(&restaurant_id, &menu_item)?,
            ),
        };

        let raw = RawFeatures {
            day_of_week,
            meal_period: request.meal_period,
            is_holiday: Some(request.is_holiday.unwrap_or(FeatureValue::Number(0.0))),
            weather: request.weather,
            temperature: Some(
                request
                    .temperature
                    .unwrap_or(FeatureValue::Number(DEFAULT_TEMPERATURE)),
            ),
            sales_last_30d_avg: Some(sales_last_30d_avg),
        };

        worker_state
            .predictor
            .predict_raw(&restaurant_id, &menu_item, raw)
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    info!(
        menu_item = %prediction.menu_item,
        demand = prediction.demand,
        "Prediction served"
    );
    Ok(Json(prediction))
}
