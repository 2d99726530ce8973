//! Callback registration and outbound delivery models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::transaction::DecisionRecord;

/// A registered callback URL. Registration is idempotent by URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackRegistration {
    pub url: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterCallback {
    #[validate(url)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveCallback {
    pub url: String,
}

/// Written once per successful delivery, bounded (oldest evicted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLogEntry {
    pub url: String,
    pub status_code: u16,
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    pub transaction_id: String,
}

/// Written once per (URL, record) pair that exhausted every retry. Terminal;
/// replay is an operator action outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub url: String,
    pub payload: serde_json::Value,
    pub failed_at: DateTime<Utc>,
    pub attempts: u32,
}

/// Envelope posted to callback URLs.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackEvent {
    pub event: &'static str,
    pub timestamp: DateTime<Utc>,
    pub data: DecisionRecord,
}

impl CallbackEvent {
    pub fn flagged(record: DecisionRecord) -> Self {
        Self {
            event: "transaction.flagged",
            timestamp: Utc::now(),
            data: record,
        }
    }
}

/// Listing response: registrations plus recent successful deliveries.
#[derive(Debug, Serialize)]
pub struct CallbackOverview {
    pub callbacks: Vec<CallbackRegistration>,
    pub recent_deliveries: Vec<DeliveryLogEntry>,
}
