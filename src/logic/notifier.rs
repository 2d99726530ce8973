//! Outbound callback notifier
//!
//! Delivers flagged decision records to registered callback URLs. Each
//! (URL, record) pair gets its own task with bounded retries and exponential
//! backoff; exhaustion lands the payload in the dead-letter queue. One URL's
//! failure never affects another's delivery.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use crate::models::{CallbackEvent, CallbackRegistration, DeadLetterEntry, DecisionRecord, DeliveryLogEntry};

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub max_attempts: u32,
    /// First backoff delay; doubles after each failed attempt.
    pub backoff_base: Duration,
    /// Per-attempt timeout; a timeout consumes one attempt like any failure.
    pub request_timeout: Duration,
    pub delivery_log_capacity: usize,
    pub dead_letter_capacity: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
            delivery_log_capacity: 500,
            dead_letter_capacity: 500,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("callback url must be http or https")]
pub struct InvalidCallbackUrl;

pub struct OutboundNotifier {
    config: NotifierConfig,
    client: reqwest::Client,
    callbacks: Mutex<BTreeMap<String, CallbackRegistration>>,
    delivery_log: Mutex<VecDeque<DeliveryLogEntry>>,
    dead_letters: Mutex<VecDeque<DeadLetterEntry>>,
    /// In-flight delivery tasks, aborted on shutdown.
    tasks: Mutex<JoinSet<()>>,
}

impl OutboundNotifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            callbacks: Mutex::new(BTreeMap::new()),
            delivery_log: Mutex::new(VecDeque::new()),
            dead_letters: Mutex::new(VecDeque::new()),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Idempotent by URL: registering a duplicate returns the existing
    /// registration unchanged.
    pub fn register(&self, url: &str) -> Result<CallbackRegistration, InvalidCallbackUrl> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(InvalidCallbackUrl);
        }

        let mut callbacks = self.callbacks.lock();
        let registration = callbacks
            .entry(url.to_string())
            .or_insert_with(|| {
                tracing::info!(url, "callback registered");
                CallbackRegistration {
                    url: url.to_string(),
                    registered_at: Utc::now(),
                }
            })
            .clone();
        Ok(registration)
    }

    /// Removing an absent URL is a no-op; returns whether anything was
    /// removed.
    pub fn remove(&self, url: &str) -> bool {
        let removed = self.callbacks.lock().remove(url).is_some();
        if removed {
            tracing::info!(url, "callback removed");
        }
        removed
    }

    pub fn registrations(&self) -> Vec<CallbackRegistration> {
        self.callbacks.lock().values().cloned().collect()
    }

    /// Most recent successful deliveries first.
    pub fn delivery_log(&self, limit: usize) -> Vec<DeliveryLogEntry> {
        self.delivery_log
            .lock()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Most recent dead letters first, bounded page.
    pub fn dead_letters(&self, limit: usize, offset: usize) -> Vec<DeadLetterEntry> {
        self.dead_letters
            .lock()
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn dead_letter_count(&self) -> usize {
        self.dead_letters.lock().len()
    }

    /// Dispatch `record` to every registered callback, one independent task
    /// per URL. No-op unless the record is flagged for manual review.
    pub fn notify(self: &Arc<Self>, record: &DecisionRecord) {
        if !record.is_flagged() {
            return;
        }

        let urls: Vec<String> = self.callbacks.lock().keys().cloned().collect();
        if urls.is_empty() {
            return;
        }

        let payload = match serde_json::to_value(CallbackEvent::flagged(record.clone())) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("failed to serialize callback payload: {}", err);
                return;
            }
        };

        let mut tasks = self.tasks.lock();
        for url in urls {
            let notifier = Arc::clone(self);
            let payload = payload.clone();
            let transaction_id = record.transaction_id.clone();
            tasks.spawn(async move {
                notifier.deliver(url, payload, transaction_id).await;
            });
        }
    }

    /// One delivery sequence for one (URL, record) pair. Success is any
    /// status below 300. The dead letter is written only after the final
    /// attempt fails; a cancelled sequence writes nothing.
    async fn deliver(&self, url: String, payload: serde_json::Value, transaction_id: String) {
        for attempt in 1..=self.config.max_attempts {
            let sent = self
                .client
                .post(url.as_str())
                .timeout(self.config.request_timeout)
                .json(&payload)
                .send()
                .await;

            match sent {
                Ok(response) if response.status().as_u16() < 300 => {
                    tracing::info!(url = %url, attempt, txn = %transaction_id, "callback delivered");
                    self.log_delivery(DeliveryLogEntry {
                        url,
                        status_code: response.status().as_u16(),
                        attempt,
                        timestamp: Utc::now(),
                        transaction_id,
                    });
                    return;
                }
                Ok(response) => {
                    tracing::warn!(
                        url = %url,
                        attempt,
                        status = response.status().as_u16(),
                        "callback delivery rejected"
                    );
                }
                Err(err) => {
                    tracing::warn!(url = %url, attempt, "callback delivery failed: {}", err);
                }
            }

            if attempt < self.config.max_attempts {
                let backoff = self.config.backoff_base * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(backoff).await;
            }
        }

        tracing::error!(
            url = %url,
            attempts = self.config.max_attempts,
            txn = %transaction_id,
            "callback delivery exhausted, dead-lettering"
        );
        self.dead_letter(DeadLetterEntry {
            url,
            payload,
            failed_at: Utc::now(),
            attempts: self.config.max_attempts,
        });
    }

    fn log_delivery(&self, entry: DeliveryLogEntry) {
        let mut log = self.delivery_log.lock();
        if log.len() >= self.config.delivery_log_capacity {
            log.pop_front();
        }
        log.push_back(entry);
    }

    fn dead_letter(&self, entry: DeadLetterEntry) {
        let mut queue = self.dead_letters.lock();
        if queue.len() >= self.config.dead_letter_capacity {
            queue.pop_front();
        }
        queue.push_back(entry);
    }

    /// Wait for every spawned delivery task to finish. Used by tests and by
    /// orderly drains where in-flight retries should complete.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        while tasks.join_next().await.is_some() {}
    }

    /// Abort in-flight deliveries and reap them. A cancelled retry sequence
    /// leaves no partial state behind.
    pub async fn shutdown(&self) {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        tasks.shutdown().await;
    }
}
