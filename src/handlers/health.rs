//! Liveness handler
//!
//! Reports pipeline state alongside the usual status line: whether the pull
//! scheduler loop is running, how many SSE subscribers are attached, and how
//! many callback URLs are registered.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    scheduler_running: bool,
    live_subscribers: usize,
    registered_callbacks: usize,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        scheduler_running: state.scheduler.is_running(),
        live_subscribers: state.bus.subscriber_count(),
        registered_callbacks: state.notifier.registrations().len(),
    })
}
