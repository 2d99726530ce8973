//! Results query handler

use axum::{
    extract::{Query, State},
    Json,
};

use crate::models::{DecisionRecord, TransactionFilter};
use crate::{AppError, AppResult, AppState};

/// List stored decision records, newest first, filtered by source and/or
/// flagged-only, with bounded paging.
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> AppResult<Json<Vec<DecisionRecord>>> {
    let records = state
        .store
        .list(&filter)
        .await
        .map_err(|err| AppError::Internal(err.to_string()))?;
    Ok(Json(records))
}
