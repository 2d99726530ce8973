//! Transaction ingestion and decision models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw transaction as submitted by a push caller or fetched from a pull source.
///
/// Everything except `amount` is optional; defaults are applied by the
/// ingestion gateway. Unknown metadata travels in the open-ended `meta` map,
/// never as an untyped top-level blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    pub transaction_id: Option<String>,
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    /// ISO-8601 string; unparsable values degrade to ingestion time.
    pub timestamp: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub meta: Option<HashMap<String, serde_json::Value>>,
}

/// Where a transaction entered the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestSource {
    Push,
    Programmatic,
    /// Pulled from a configured external source; carries the source name.
    Pull(String),
}

impl IngestSource {
    /// Stable string tag stored on the decision record (`push`,
    /// `programmatic`, `pull:{name}`).
    pub fn tag(&self) -> String {
        match self {
            IngestSource::Push => "push".to_string(),
            IngestSource::Programmatic => "programmatic".to_string(),
            IngestSource::Pull(name) => format!("pull:{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    ManualReview,
}

impl Decision {
    /// Fixed-threshold decision: strictly above the threshold flags the
    /// transaction for review, at-or-below approves.
    pub fn from_score(score: f64, review_threshold: f64) -> Self {
        if score > review_threshold {
            Decision::ManualReview
        } else {
            Decision::Approve
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::High
        } else if score >= 0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// The scored, sanitized, persisted form of one transaction.
///
/// `transaction_id` is the idempotency key: re-ingesting the same id updates
/// the stored record in place and preserves `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub transaction_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub timestamp: DateTime<Utc>,
    pub decision: Decision,
    pub anomaly_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
    pub model_version: String,
    pub source: String,
    pub meta: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn is_flagged(&self) -> bool {
        self.decision == Decision::ManualReview
    }
}

/// Per-item ingest failure. Sibling items in the same batch are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestError {
    pub reason: String,
}

impl IngestError {
    pub fn new(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }
}

/// One entry of the order-preserving per-item result list.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum IngestOutcome {
    Accepted(DecisionRecord),
    Rejected(IngestError),
}

impl IngestOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestOutcome::Accepted(_))
    }

    pub fn record(&self) -> Option<&DecisionRecord> {
        match self {
            IngestOutcome::Accepted(record) => Some(record),
            IngestOutcome::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&IngestError> {
        match self {
            IngestOutcome::Accepted(_) => None,
            IngestOutcome::Rejected(err) => Some(err),
        }
    }
}

/// Batch-level response: per-item outcomes in input order plus aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub results: Vec<IngestOutcome>,
    pub ingested: usize,
    pub flagged: usize,
    pub total_amount: f64,
}

/// Results-query filter (source tag and/or flagged-only, bounded paging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    pub source: Option<String>,
    pub flagged_only: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
