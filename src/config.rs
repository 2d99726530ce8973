//! Configuration module

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Shared secret for the ingestion and management API
    pub api_secret: String,

    /// Maximum items per ingest call; larger batches are rejected whole
    pub batch_limit: usize,

    /// Scores strictly above this flag a transaction for manual review
    pub review_threshold: f64,

    /// Transaction type applied when the caller omits one
    pub default_tx_type: String,

    /// Live-stream replay buffer capacity
    pub replay_capacity: usize,

    /// Per-subscriber queue capacity; a full queue drops the subscriber
    pub subscriber_capacity: usize,

    /// Delivery log capacity (oldest evicted)
    pub delivery_log_capacity: usize,

    /// Dead-letter queue capacity (oldest evicted)
    pub dead_letter_capacity: usize,

    /// Delivery attempts per callback per record
    pub notify_max_attempts: u32,

    /// First backoff delay in milliseconds; doubles per attempt
    pub notify_backoff_ms: u64,

    /// Per-attempt delivery timeout in seconds
    pub notify_timeout_secs: u64,

    /// Coarse scheduler wake interval in seconds
    pub scheduler_tick_secs: u64,

    /// Per-request pull fetch timeout in seconds
    pub pull_timeout_secs: u64,

    /// Admitted calls per key per window
    pub rate_limit_max: u32,

    /// Sliding-window length in seconds
    pub rate_limit_window_secs: u64,

    /// Callback URLs registered at startup (comma-separated)
    pub seed_callback_urls: Vec<String>,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            api_secret: env::var("API_SECRET")
                .unwrap_or_else(|_| "dev-ingest-secret-change-in-production".to_string()),

            batch_limit: env::var("BATCH_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),

            review_threshold: env::var("REVIEW_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.7),

            default_tx_type: env::var("DEFAULT_TX_TYPE")
                .unwrap_or_else(|_| "purchase".to_string()),

            replay_capacity: env::var("REPLAY_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),

            subscriber_capacity: env::var("SUBSCRIBER_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),

            delivery_log_capacity: env::var("DELIVERY_LOG_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),

            dead_letter_capacity: env::var("DEAD_LETTER_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(500),

            notify_max_attempts: env::var("NOTIFY_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),

            notify_backoff_ms: env::var("NOTIFY_BACKOFF_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1_000),

            notify_timeout_secs: env::var("NOTIFY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            scheduler_tick_secs: env::var("SCHEDULER_TICK_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),

            pull_timeout_secs: env::var("PULL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),

            rate_limit_max: env::var("RATE_LIMIT_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),

            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),

            seed_callback_urls: env::var("CALLBACK_URLS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
