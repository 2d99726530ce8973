//! Authentication middleware
//!
//! The API is guarded by a shared secret presented either as the `X-Api-Key`
//! header or the `api_key` query parameter (the query form exists for
//! EventSource clients, which cannot set headers). A missing credential and a
//! mismatching one are distinct failures.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::{AppError, AppState};

const API_KEY_HEADER: &str = "x-api-key";
const API_KEY_PARAM: &str = "api_key";

/// Middleware: require the shared API secret
pub async fn require_api_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = header_secret(&req)
        .or_else(|| query_secret(&req))
        .ok_or(AppError::MissingCredentials)?;

    if !secret_matches(&presented, &state.config.api_secret) {
        tracing::warn!("request rejected: invalid API key");
        return Err(AppError::InvalidCredentials);
    }

    Ok(next.run(req).await)
}

fn header_secret(req: &Request) -> Option<String> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn query_secret(req: &Request) -> Option<String> {
    req.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == API_KEY_PARAM).then(|| value.to_string())
        })
    })
}

/// Compare digests, not raw bytes.
fn secret_matches(presented: &str, expected: &str) -> bool {
    hash_secret(presented) == hash_secret(expected)
}

fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
