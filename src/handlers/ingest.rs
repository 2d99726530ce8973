//! Push ingestion handler

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::models::{IngestReport, IngestSource, RawTransaction};
use crate::{AppError, AppResult, AppState};

/// A push call carries either one transaction object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngestBody {
    One(RawTransaction),
    Many(Vec<RawTransaction>),
}

impl IngestBody {
    fn into_batch(self) -> Vec<RawTransaction> {
        match self {
            IngestBody::One(txn) => vec![txn],
            IngestBody::Many(batch) => batch,
        }
    }
}

/// Ingest a batch pushed over HTTP. Per-item failures are reported in the
/// result array; only an oversized batch rejects the whole call.
pub async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<IngestBody>,
) -> AppResult<Json<IngestReport>> {
    if !state.rate_limiter.allow("ingest") {
        return Err(AppError::Throttled);
    }

    let report = state
        .gateway
        .ingest(body.into_batch(), IngestSource::Push)
        .await
        .map_err(|err| AppError::Validation(err.to_string()))?;

    Ok(Json(report))
}
