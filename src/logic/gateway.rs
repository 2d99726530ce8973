//! Ingestion gateway
//!
//! The single write path: normalize, score, sanitize, upsert, publish,
//! notify. Called concurrently by push handlers, the pull scheduler, and
//! programmatic callers; items inside one batch are processed in order and
//! failures stay local to their item.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::logic::bus::EventBus;
use crate::logic::classifier::Classifier;
use crate::logic::notifier::OutboundNotifier;
use crate::logic::sanitizer::FieldSanitizer;
use crate::logic::store::TransactionStore;
use crate::models::{
    Decision, DecisionRecord, IngestError, IngestOutcome, IngestReport, IngestSource,
    RawTransaction, RiskLevel,
};

pub const REASON_INVALID_AMOUNT: &str = "invalid_amount";
pub const REASON_CLASSIFIER_ERROR: &str = "classifier_error";
pub const REASON_STORAGE_ERROR: &str = "storage_error";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub batch_limit: usize,
    pub review_threshold: f64,
    pub default_tx_type: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            batch_limit: 10_000,
            review_threshold: 0.7,
            default_tx_type: "purchase".to_string(),
        }
    }
}

/// Whole-call rejection, raised before any item is touched.
#[derive(Debug, thiserror::Error)]
#[error("batch of {got} items exceeds limit of {limit}")]
pub struct BatchTooLarge {
    pub got: usize,
    pub limit: usize,
}

pub struct IngestionGateway {
    config: GatewayConfig,
    classifier: Arc<dyn Classifier>,
    sanitizer: Arc<dyn FieldSanitizer>,
    store: Arc<dyn TransactionStore>,
    bus: Arc<EventBus>,
    notifier: Arc<OutboundNotifier>,
}

impl IngestionGateway {
    pub fn new(
        config: GatewayConfig,
        classifier: Arc<dyn Classifier>,
        sanitizer: Arc<dyn FieldSanitizer>,
        store: Arc<dyn TransactionStore>,
        bus: Arc<EventBus>,
        notifier: Arc<OutboundNotifier>,
    ) -> Self {
        Self {
            config,
            classifier,
            sanitizer,
            store,
            bus,
            notifier,
        }
    }

    /// Process one batch. The result list is 1:1 with the input in input
    /// order; aggregates cover the accepted items only.
    pub async fn ingest(
        &self,
        batch: Vec<RawTransaction>,
        source: IngestSource,
    ) -> Result<IngestReport, BatchTooLarge> {
        if batch.len() > self.config.batch_limit {
            return Err(BatchTooLarge {
                got: batch.len(),
                limit: self.config.batch_limit,
            });
        }

        let source_tag = source.tag();
        let mut results = Vec::with_capacity(batch.len());
        let mut ingested = 0usize;
        let mut flagged = 0usize;
        let mut total_amount = 0f64;

        for raw in batch {
            match self.process_item(raw, &source_tag).await {
                Ok(record) => {
                    ingested += 1;
                    total_amount += record.amount;
                    if record.is_flagged() {
                        flagged += 1;
                    }
                    results.push(IngestOutcome::Accepted(record));
                }
                Err(err) => {
                    results.push(IngestOutcome::Rejected(err));
                }
            }
        }

        tracing::info!(
            source = %source_tag,
            total = results.len(),
            ingested,
            flagged,
            "batch ingested"
        );

        Ok(IngestReport {
            results,
            ingested,
            flagged,
            total_amount,
        })
    }

    /// Exactly one score / sanitize / upsert / publish sequence per accepted
    /// item. A classifier or store failure rejects this item only.
    async fn process_item(
        &self,
        raw: RawTransaction,
        source_tag: &str,
    ) -> Result<DecisionRecord, IngestError> {
        let amount = match raw.amount {
            Some(amount) if amount > 0.0 => amount,
            _ => return Err(IngestError::new(REASON_INVALID_AMOUNT)),
        };

        let transaction_id = raw
            .transaction_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("txn-{}-{}", source_tag, Uuid::new_v4()));

        let tx_type = raw
            .tx_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.config.default_tx_type.clone());

        // Malformed timestamps degrade to ingestion time, never fail the item.
        let timestamp = raw
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        let currency = raw
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "USD".to_string());

        let outcome = self
            .classifier
            .score(amount, timestamp, &tx_type)
            .await
            .map_err(|err| {
                tracing::warn!(txn = %transaction_id, "classifier failed: {}", err);
                IngestError::new(REASON_CLASSIFIER_ERROR)
            })?;

        let score = outcome.score.clamp(0.0, 1.0);
        let decision = Decision::from_score(score, self.config.review_threshold);
        let meta = self.sanitizer.sanitize(raw.meta.unwrap_or_default());
        let now = Utc::now();

        let candidate = DecisionRecord {
            transaction_id: transaction_id.clone(),
            amount,
            currency,
            tx_type,
            timestamp,
            decision,
            anomaly_score: score,
            risk_level: RiskLevel::from_score(score),
            risk_factors: outcome.risk_factors,
            model_version: outcome.model_version,
            source: source_tag.to_string(),
            meta,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.upsert(candidate).await.map_err(|err| {
            tracing::error!(txn = %transaction_id, "upsert failed: {}", err);
            IngestError::new(REASON_STORAGE_ERROR)
        })?;

        self.bus.publish(stored.clone());
        if stored.is_flagged() {
            self.notifier.notify(&stored);
        }

        Ok(stored)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
