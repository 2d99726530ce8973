//! Callback management handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::models::{CallbackOverview, CallbackRegistration, DeadLetterEntry, RegisterCallback, RemoveCallback};
use crate::{AppError, AppResult, AppState};

const RECENT_DELIVERIES: usize = 50;

/// Register a callback URL; a duplicate registration is a no-op.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterCallback>,
) -> AppResult<Json<CallbackRegistration>> {
    req.validate()?;
    let registration = state
        .notifier
        .register(&req.url)
        .map_err(|err| AppError::Validation(err.to_string()))?;
    Ok(Json(registration))
}

/// Remove a callback URL; removing an absent URL is a no-op.
pub async fn remove(
    State(state): State<AppState>,
    Json(req): Json<RemoveCallback>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = state.notifier.remove(&req.url);
    Ok(Json(serde_json::json!({ "removed": removed })))
}

/// List registered callbacks plus recent successful deliveries.
pub async fn list(State(state): State<AppState>) -> Json<CallbackOverview> {
    Json(CallbackOverview {
        callbacks: state.notifier.registrations(),
        recent_deliveries: state.notifier.delivery_log(RECENT_DELIVERIES),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct DeadLetterQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Inspect the dead-letter queue (bounded page, newest first).
pub async fn dead_letters(
    State(state): State<AppState>,
    Query(query): Query<DeadLetterQuery>,
) -> Json<Vec<DeadLetterEntry>> {
    let limit = query.limit.unwrap_or(50).min(200);
    let offset = query.offset.unwrap_or(0);
    Json(state.notifier.dead_letters(limit, offset))
}
