//! Pull-source management handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreatePullSource, PullOutcome, PullSource, UpdatePullSource};
use crate::{AppError, AppResult, AppState};

/// Register a new pull source.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePullSource>,
) -> AppResult<Json<PullSource>> {
    req.validate()?;
    Ok(Json(state.scheduler.add_source(req)))
}

/// List sources; configured headers are never echoed back.
pub async fn list(State(state): State<AppState>) -> Json<Vec<PullSource>> {
    Json(state.scheduler.list_sources())
}

/// Enable/disable a source or edit its polling interval.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePullSource>,
) -> AppResult<Json<PullSource>> {
    let source = state
        .scheduler
        .update_source(id, req)
        .map_err(|err| AppError::NotFound(err.to_string()))?;
    Ok(Json(source))
}

/// Remove a source by id.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .scheduler
        .remove_source(id)
        .map_err(|err| AppError::NotFound(err.to_string()))?;
    Ok(Json(serde_json::json!({ "removed": true })))
}

/// Force one immediate pull cycle, bypassing the interval check.
pub async fn trigger(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PullOutcome>> {
    let outcome = state
        .scheduler
        .trigger(id)
        .await
        .map_err(|err| AppError::NotFound(err.to_string()))?;
    Ok(Json(outcome))
}
