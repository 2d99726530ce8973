//! Sliding-window rate limiter
//!
//! Guards the ingestion surface per logical operation key. Each check prunes
//! timestamps older than the window, then admits only while the remaining
//! count is below the limit. A timestamp is recorded on admission only.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_calls: u32,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Admit or throttle one call for `key`.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Deterministic variant used by tests.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = self.hits.lock();
        let window = self.window;
        let calls = hits.entry(key.to_string()).or_default();

        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) >= window {
                calls.pop_front();
            } else {
                break;
            }
        }

        if calls.len() < self.max_calls as usize {
            calls.push_back(now);
            true
        } else {
            tracing::debug!(key, "rate limit hit");
            false
        }
    }
}
