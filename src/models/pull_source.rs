//! Pull source models and accepted response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::transaction::RawTransaction;

/// A registered external source polled on its own cadence.
///
/// `headers` are write-only operator secrets: they are sent on every pull
/// request but never serialized back out of the API.
#[derive(Debug, Clone, Serialize)]
pub struct PullSource {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing)]
    pub headers: HashMap<String, String>,
    pub interval_seconds: u64,
    pub enabled: bool,
    pub last_pull_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<PullOutcome>,
    pub created_at: DateTime<Utc>,
}

fn default_interval() -> u64 {
    60
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePullSource {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePullSource {
    pub enabled: Option<bool>,
    pub interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullStatus {
    Ok,
    Empty,
    Error,
}

/// Result of one pull cycle, kept on the source for operational visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullOutcome {
    pub status: PullStatus,
    pub fetched: usize,
    pub ingested: usize,
    pub flagged: usize,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl PullOutcome {
    pub fn ok(fetched: usize, ingested: usize, flagged: usize) -> Self {
        Self {
            status: PullStatus::Ok,
            fetched,
            ingested,
            flagged,
            error: None,
            at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self {
            status: PullStatus::Empty,
            fetched: 0,
            ingested: 0,
            flagged: 0,
            error: None,
            at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: PullStatus::Error,
            fetched: 0,
            ingested: 0,
            flagged: 0,
            error: Some(message.into()),
            at: Utc::now(),
        }
    }
}

/// The closed set of response shapes a pull source may return: either a bare
/// JSON array of transactions or an object wrapping them under `transactions`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PullResponseBody {
    List(Vec<RawTransaction>),
    Wrapped { transactions: Vec<RawTransaction> },
}

impl PullResponseBody {
    pub fn into_transactions(self) -> Vec<RawTransaction> {
        match self {
            PullResponseBody::List(items) => items,
            PullResponseBody::Wrapped { transactions } => transactions,
        }
    }
}
