//! Fraudgate - Transaction Decision Pipeline
//!
//! Ingests financial-transaction events from push callers and polled
//! sources, scores and persists each exactly once, and distributes the
//! resulting decision to live SSE subscribers and registered callback URLs.
//!
//! # Architecture
//!
//! ```text
//! push / pull / programmatic
//!        │
//!        ▼
//!   Rate Limiter ──► Ingestion Gateway ──► Classifier / Sanitizer / Store
//!                          │
//!                ┌─────────┴──────────┐
//!                ▼                    ▼
//!            Event Bus          Outbound Notifier
//!        (SSE subscribers)   (callbacks, retry, DLQ)
//! ```

mod config;
mod error;
mod handlers;
mod logic;
mod middleware;
mod models;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logic::bus::EventBus;
use logic::classifier::HeuristicClassifier;
use logic::gateway::{GatewayConfig, IngestionGateway};
use logic::notifier::{NotifierConfig, OutboundNotifier};
use logic::rate_limit::RateLimiter;
use logic::sanitizer::DefaultSanitizer;
use logic::scheduler::{PullScheduler, SchedulerConfig};
use logic::store::{InMemoryStore, TransactionStore};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraudgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    tracing::info!("Fraudgate starting...");
    tracing::info!(
        "Batch limit: {}, review threshold: {}",
        config.batch_limit,
        config.review_threshold
    );

    let state = build_state(config.clone());

    // Seed callbacks configured at startup
    for url in &config.seed_callback_urls {
        if let Err(err) = state.notifier.register(url) {
            tracing::warn!(url = %url, "skipping seeded callback: {}", err);
        }
    }

    // Start the pull scheduler loop
    state.scheduler.start();

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Orderly teardown: stop polling, then abort in-flight deliveries.
    state.scheduler.stop().await;
    state.notifier.shutdown().await;
    tracing::info!("Fraudgate stopped");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub store: Arc<dyn TransactionStore>,
    pub bus: Arc<EventBus>,
    pub notifier: Arc<OutboundNotifier>,
    pub gateway: Arc<IngestionGateway>,
    pub scheduler: Arc<PullScheduler>,
    pub rate_limiter: Arc<RateLimiter>,
}

/// Construct every long-lived service explicitly and wire them together;
/// nothing is reached through ambient globals.
fn build_state(config: config::Config) -> AppState {
    let store: Arc<dyn TransactionStore> = Arc::new(InMemoryStore::new());
    let bus = Arc::new(EventBus::new(
        config.replay_capacity,
        config.subscriber_capacity,
    ));
    let notifier = Arc::new(OutboundNotifier::new(NotifierConfig {
        max_attempts: config.notify_max_attempts,
        backoff_base: Duration::from_millis(config.notify_backoff_ms),
        request_timeout: Duration::from_secs(config.notify_timeout_secs),
        delivery_log_capacity: config.delivery_log_capacity,
        dead_letter_capacity: config.dead_letter_capacity,
    }));
    let gateway = Arc::new(IngestionGateway::new(
        GatewayConfig {
            batch_limit: config.batch_limit,
            review_threshold: config.review_threshold,
            default_tx_type: config.default_tx_type.clone(),
        },
        Arc::new(HeuristicClassifier::new()),
        Arc::new(DefaultSanitizer::new()),
        store.clone(),
        bus.clone(),
        notifier.clone(),
    ));
    let scheduler = Arc::new(PullScheduler::new(
        SchedulerConfig {
            tick: Duration::from_secs(config.scheduler_tick_secs),
            fetch_timeout: Duration::from_secs(config.pull_timeout_secs),
        },
        gateway.clone(),
    ));
    let rate_limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    ));

    AppState {
        config,
        store,
        bus,
        notifier,
        gateway,
        scheduler,
        rate_limiter,
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(handlers::health::check));

    // Everything else requires the shared API secret
    let api_routes = Router::new()
        // Ingestion
        .route("/api/v1/transactions/ingest", post(handlers::ingest::ingest))
        .route("/api/v1/transactions", get(handlers::transactions::list))

        // Live stream
        .route("/api/v1/stream", get(handlers::stream::stream))

        // Callbacks
        .route("/api/v1/callbacks", get(handlers::callbacks::list))
        .route("/api/v1/callbacks", post(handlers::callbacks::register))
        .route("/api/v1/callbacks", delete(handlers::callbacks::remove))
        .route("/api/v1/callbacks/dead-letters", get(handlers::callbacks::dead_letters))

        // Pull sources
        .route("/api/v1/sources", get(handlers::sources::list))
        .route("/api/v1/sources", post(handlers::sources::create))
        .route("/api/v1/sources/:id", put(handlers::sources::update))
        .route("/api/v1/sources/:id", delete(handlers::sources::remove))
        .route("/api/v1/sources/:id/pull", post(handlers::sources::trigger))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_secret,
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app_and_secret() -> (Router, String) {
        let state = test_support::state();
        let secret = state.config.api_secret.clone();
        (create_router(state), secret)
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (app, _) = app_and_secret();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_pipeline_state() {
        let state = test_support::state();
        state.notifier.register("https://ops.example/hook").unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let health: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(health["status"], "healthy");
        assert_eq!(health["scheduler_running"], false);
        assert_eq!(health["live_subscribers"], 0);
        assert_eq!(health["registered_callbacks"], 1);
    }

    #[tokio::test]
    async fn test_stream_replays_decisions_over_http() {
        let (app, secret) = app_and_secret();

        let ingest = Request::post("/api/v1/transactions/ingest")
            .header("x-api-key", &secret)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"amount": 75, "transaction_id": "tx-sse-1"}"#))
            .unwrap();
        app.clone().oneshot(ingest).await.unwrap();

        let response = app
            .oneshot(
                Request::get("/api/v1/stream")
                    .header("x-api-key", &secret)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );

        // The body never ends; read only the first frame, which carries the
        // replayed decision.
        let mut body = response.into_body();
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8_lossy(frame.data_ref().unwrap()).to_string();
        assert!(text.starts_with("event: decision"));
        assert!(text.contains("tx-sse-1"));
    }

    #[tokio::test]
    async fn test_ingest_roundtrip_over_http() {
        let (app, secret) = app_and_secret();
        let body = r#"[{"amount": 100}, {"amount": -5}, {"amount": 50}]"#;

        let response = app
            .oneshot(
                Request::post("/api/v1/transactions/ingest")
                    .header("x-api-key", &secret)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report["ingested"], 2);
        assert_eq!(report["results"][1]["reason"], "invalid_amount");
        assert_eq!(report["total_amount"], 150.0);
    }

    #[tokio::test]
    async fn test_single_object_ingest_is_accepted() {
        let (app, secret) = app_and_secret();

        let response = app
            .oneshot(
                Request::post("/api/v1/transactions/ingest")
                    .header("x-api-key", &secret)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"amount": 42, "transaction_id": "tx-1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let report: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(report["ingested"], 1);
        assert_eq!(report["results"][0]["transaction_id"], "tx-1");
    }

    #[tokio::test]
    async fn test_unauthenticated_ingest_is_rejected() {
        let (app, _) = app_and_secret();
        let response = app
            .oneshot(
                Request::post("/api/v1/transactions/ingest")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"amount": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_callback_management_roundtrip() {
        let (app, secret) = app_and_secret();

        let register = Request::post("/api/v1/callbacks")
            .header("x-api-key", &secret)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"url": "https://ops.example/hook"}"#))
            .unwrap();
        let response = app.clone().oneshot(register).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bad_scheme = Request::post("/api/v1/callbacks")
            .header("x-api-key", &secret)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"url": "ftp://ops.example/hook"}"#))
            .unwrap();
        let response = app.clone().oneshot(bad_scheme).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let listing = Request::get("/api/v1/callbacks")
            .header("x-api-key", &secret)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(listing).await.unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let overview: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(overview["callbacks"][0]["url"], "https://ops.example/hook");

        let dead = Request::get("/api/v1/callbacks/dead-letters")
            .header("x-api-key", &secret)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(dead).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_source_management_roundtrip() {
        let (app, secret) = app_and_secret();

        let created = app
            .clone()
            .oneshot(
                Request::post("/api/v1/sources")
                    .header("x-api-key", &secret)
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"name": "bank-a", "url": "https://bank-a.example/txns",
                            "headers": {"Authorization": "Bearer s3cret"}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::OK);
        let bytes = created.into_body().collect().await.unwrap().to_bytes();
        let source: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let id = source["id"].as_str().unwrap().to_string();
        // Headers are write-only.
        assert!(source.get("headers").is_none());

        let listed = app
            .clone()
            .oneshot(
                Request::get("/api/v1/sources")
                    .header("x-api-key", &secret)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = listed.into_body().collect().await.unwrap().to_bytes();
        assert!(!String::from_utf8_lossy(&bytes).contains("s3cret"));

        let removed = app
            .clone()
            .oneshot(
                Request::delete(format!("/api/v1/sources/{}", id))
                    .header("x-api-key", &secret)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(removed.status(), StatusCode::OK);

        let removed_again = app
            .oneshot(
                Request::delete(format!("/api/v1/sources/{}", id))
                    .header("x-api-key", &secret)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(removed_again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_results_query_filters_flagged() {
        let (app, secret) = app_and_secret();

        // 25_000 off a high-risk type scores above the review threshold.
        let body = r#"[{"amount": 25000, "type": "transfer", "timestamp": "2026-03-14T03:00:00Z"},
                       {"amount": 10}]"#;
        let ingest = Request::post("/api/v1/transactions/ingest")
            .header("x-api-key", &secret)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        app.clone().oneshot(ingest).await.unwrap();

        let flagged = app
            .oneshot(
                Request::get("/api/v1/transactions?flagged_only=true")
                    .header("x-api-key", &secret)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = flagged.into_body().collect().await.unwrap().to_bytes();
        let records: Vec<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["decision"], "manual_review");
    }
}
