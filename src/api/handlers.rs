use crate::api::AppState;
use crate::bundle::BundleMetadata;
use crate::dataset;
use crate::error::Result;
use crate::inference::{BatchPrediction, Prediction};
use crate::models::ConflictRecord;
use crate::pipeline::TrainingReport;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Readiness probe: fails until a model bundle is loaded.
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<ReadyResponse>> {
    let metadata = state.service.bundle_metadata()?;
    Ok(Json(ReadyResponse {
        status: "ready".to_string(),
        trained_at: metadata.trained_at.to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub trained_at: String,
}

/// Predict a single region-month record
pub async fn predict(
    State(state): State<AppState>,
    Json(record): Json<ConflictRecord>,
) -> Result<Json<Prediction>> {
    let prediction = state.service.predict_one(&record)?;
    Ok(Json(prediction))
}

/// Predict a batch of records submitted as a CSV document
pub async fn predict_csv(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<BatchPrediction>> {
    let records = dataset::read_inference_records(body.as_bytes())?;
    let result = state.service.predict_batch(&records)?;
    Ok(Json(result))
}

/// Retrain the model from the configured dataset and swap in the new bundle
pub async fn retrain(State(state): State<AppState>) -> Result<Json<TrainingReport>> {
    let report = state.service.retrain().await?;
    Ok(Json(report))
}

/// Metadata for the currently served model
pub async fn model_info(State(state): State<AppState>) -> Result<Json<BundleMetadata>> {
    let metadata = state.service.bundle_metadata()?;
    Ok(Json(metadata))
}
