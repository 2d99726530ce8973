//! Pull scheduler
//!
//! Polls registered external sources on their own cadences and feeds the
//! fetched transactions through the ingestion gateway, tagged
//! `pull:{name}`. One background loop wakes at a coarse tick; a source is
//! pulled when its own interval has elapsed since its last attempted poll.
//! Source failures are recorded on the source and never disable it or touch
//! its siblings.

use chrono::Utc;
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::logic::gateway::IngestionGateway;
use crate::models::{
    CreatePullSource, IngestSource, PullOutcome, PullResponseBody, PullSource, UpdatePullSource,
};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Coarse wake interval; a due source polls no more than one tick late.
    pub tick: Duration,
    pub fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(10),
            fetch_timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown pull source")]
pub struct UnknownSource;

pub struct PullScheduler {
    config: SchedulerConfig,
    gateway: Arc<IngestionGateway>,
    client: reqwest::Client,
    sources: Mutex<HashMap<Uuid, PullSource>>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl PullScheduler {
    pub fn new(config: SchedulerConfig, gateway: Arc<IngestionGateway>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            gateway,
            client: reqwest::Client::new(),
            sources: Mutex::new(HashMap::new()),
            loop_handle: Mutex::new(None),
            shutdown,
        }
    }

    // ------------------------------------------------------------------
    // Source management
    // ------------------------------------------------------------------

    /// Register a new source; the caller has already validated name + url.
    pub fn add_source(&self, req: CreatePullSource) -> PullSource {
        let source = PullSource {
            id: Uuid::new_v4(),
            name: req.name,
            url: req.url,
            headers: req.headers,
            interval_seconds: req.interval_seconds,
            enabled: req.enabled,
            last_pull_at: None,
            last_outcome: None,
            created_at: Utc::now(),
        };
        tracing::info!(source = %source.name, id = %source.id, "pull source registered");
        self.sources.lock().insert(source.id, source.clone());
        source
    }

    pub fn remove_source(&self, id: Uuid) -> Result<(), UnknownSource> {
        match self.sources.lock().remove(&id) {
            Some(source) => {
                tracing::info!(source = %source.name, id = %id, "pull source removed");
                Ok(())
            }
            None => Err(UnknownSource),
        }
    }

    pub fn update_source(
        &self,
        id: Uuid,
        update: UpdatePullSource,
    ) -> Result<PullSource, UnknownSource> {
        let mut sources = self.sources.lock();
        let source = sources.get_mut(&id).ok_or(UnknownSource)?;
        if let Some(enabled) = update.enabled {
            source.enabled = enabled;
        }
        if let Some(interval) = update.interval_seconds {
            source.interval_seconds = interval;
        }
        Ok(source.clone())
    }

    pub fn list_sources(&self) -> Vec<PullSource> {
        let mut sources: Vec<PullSource> = self.sources.lock().values().cloned().collect();
        sources.sort_by_key(|s| s.created_at);
        sources
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Spawn the background loop. Idempotent: a second start is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut handle = self.loop_handle.lock();
        if handle.is_some() {
            return;
        }

        let scheduler = Arc::clone(self);
        let mut stop = self.shutdown.subscribe();
        *handle = Some(tokio::spawn(async move {
            tracing::info!(tick_secs = scheduler.config.tick.as_secs(), "pull scheduler started");
            let mut ticker = tokio::time::interval(scheduler.config.tick);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        scheduler.run_due_cycles().await;
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("pull scheduler stopped");
        }));
    }

    pub fn is_running(&self) -> bool {
        self.loop_handle.lock().is_some()
    }

    /// Signal the loop to stop at its next suspension point and wait for it.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    // ------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------

    /// Pull every enabled source whose interval has elapsed. Cycles run
    /// concurrently so a slow source never delays its siblings within the
    /// tick. The last-attempt timestamp advances up front, so failing
    /// sources are retried at their normal cadence, never busy-looped.
    async fn run_due_cycles(&self) {
        let now = Utc::now();
        let due: Vec<Uuid> = {
            let mut sources = self.sources.lock();
            sources
                .values_mut()
                .filter(|source| {
                    source.enabled
                        && match source.last_pull_at {
                            None => true,
                            Some(last) => {
                                (now - last).num_seconds() >= source.interval_seconds as i64
                            }
                        }
                })
                .map(|source| {
                    source.last_pull_at = Some(now);
                    source.id
                })
                .collect()
        };

        if due.is_empty() {
            return;
        }

        tracing::debug!(due = due.len(), "running pull cycles");
        join_all(due.into_iter().map(|id| self.pull_cycle(id))).await;
    }

    /// Force one immediate cycle for a source, bypassing its interval check
    /// and leaving its scheduled cadence untouched.
    pub async fn trigger(&self, id: Uuid) -> Result<PullOutcome, UnknownSource> {
        if !self.sources.lock().contains_key(&id) {
            return Err(UnknownSource);
        }
        self.pull_cycle(id).await.ok_or(UnknownSource)
    }

    /// One fetch-parse-ingest cycle. Always records an outcome on the
    /// source; never propagates a failure.
    async fn pull_cycle(&self, id: Uuid) -> Option<PullOutcome> {
        let (name, url, headers) = {
            let sources = self.sources.lock();
            let source = sources.get(&id)?;
            (source.name.clone(), source.url.clone(), source.headers.clone())
        };

        let outcome = self.fetch_and_ingest(&name, &url, &headers).await;
        match outcome.status {
            crate::models::PullStatus::Error => {
                tracing::warn!(source = %name, error = ?outcome.error, "pull cycle failed");
            }
            _ => {
                tracing::debug!(source = %name, ingested = outcome.ingested, "pull cycle done");
            }
        }

        if let Some(source) = self.sources.lock().get_mut(&id) {
            source.last_outcome = Some(outcome.clone());
        }
        Some(outcome)
    }

    async fn fetch_and_ingest(
        &self,
        name: &str,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> PullOutcome {
        let mut request = self
            .client
            .get(url)
            .timeout(self.config.fetch_timeout);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return PullOutcome::error(format!("fetch failed: {err}")),
        };

        if !response.status().is_success() {
            return PullOutcome::error(format!("unexpected status {}", response.status()));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return PullOutcome::error(format!("body read failed: {err}")),
        };
        if body.trim().is_empty() {
            return PullOutcome::empty();
        }

        let transactions = match serde_json::from_str::<PullResponseBody>(&body) {
            Ok(parsed) => parsed.into_transactions(),
            Err(err) => return PullOutcome::error(format!("malformed body: {err}")),
        };
        if transactions.is_empty() {
            return PullOutcome::empty();
        }

        let fetched = transactions.len();
        match self
            .gateway
            .ingest(transactions, IngestSource::Pull(name.to_string()))
            .await
        {
            Ok(report) => PullOutcome::ok(fetched, report.ingested, report.flagged),
            Err(err) => PullOutcome::error(err.to_string()),
        }
    }
}
