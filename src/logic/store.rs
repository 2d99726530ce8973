//! Transaction repository contract
//!
//! The relational layer is a collaborator behind this trait; the one
//! obligation this service relies on is an atomic keyed upsert where a second
//! write with the same `transaction_id` updates instead of duplicating. The
//! in-memory implementation ships as the default backend and as the test
//! double.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::models::{DecisionRecord, TransactionFilter};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert or update by `transaction_id`. An update preserves the
    /// original `created_at`.
    async fn upsert(&self, record: DecisionRecord) -> Result<DecisionRecord, StoreError>;

    async fn get(&self, transaction_id: &str) -> Result<Option<DecisionRecord>, StoreError>;

    /// Newest-first listing with source / flagged-only filters and bounded
    /// paging (default 50, hard cap 200).
    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<DecisionRecord>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

#[derive(Default)]
struct StoreInner {
    records: HashMap<String, DecisionRecord>,
    /// Insertion order of first appearance, oldest first.
    order: Vec<String>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn upsert(&self, mut record: DecisionRecord) -> Result<DecisionRecord, StoreError> {
        let mut inner = self.inner.write();
        let existing_created_at = inner
            .records
            .get(&record.transaction_id)
            .map(|existing| existing.created_at);
        match existing_created_at {
            Some(created_at) => record.created_at = created_at,
            None => inner.order.push(record.transaction_id.clone()),
        }
        inner
            .records
            .insert(record.transaction_id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, transaction_id: &str) -> Result<Option<DecisionRecord>, StoreError> {
        Ok(self.inner.read().records.get(transaction_id).cloned())
    }

    async fn list(&self, filter: &TransactionFilter) -> Result<Vec<DecisionRecord>, StoreError> {
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        let offset = filter.offset.unwrap_or(0);

        let inner = self.inner.read();
        let records = inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.records.get(id))
            .filter(|record| match &filter.source {
                Some(source) => &record.source == source,
                None => true,
            })
            .filter(|record| {
                if filter.flagged_only.unwrap_or(false) {
                    record.is_flagged()
                } else {
                    true
                }
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(records)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decision, RiskLevel};
    use chrono::{Duration, Utc};

    fn record(id: &str, amount: f64, source: &str, decision: Decision) -> DecisionRecord {
        DecisionRecord {
            transaction_id: id.to_string(),
            amount,
            currency: "USD".to_string(),
            tx_type: "purchase".to_string(),
            timestamp: Utc::now(),
            decision,
            anomaly_score: 0.1,
            risk_level: RiskLevel::Low,
            risk_factors: vec![],
            model_version: "heuristic-v1".to_string(),
            source: source.to_string(),
            meta: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_updates_instead_of_duplicating() {
        let store = InMemoryStore::new();

        let first = record("tx-1", 100.0, "push", Decision::Approve);
        let original_created = first.created_at - Duration::seconds(30);
        let mut first = first;
        first.created_at = original_created;
        store.upsert(first).await.unwrap();

        let second = record("tx-1", 250.0, "push", Decision::Approve);
        let stored = store.upsert(second).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(stored.amount, 250.0);
        // Creation time survives the update.
        assert_eq!(stored.created_at, original_created);

        let fetched = store.get("tx-1").await.unwrap().unwrap();
        assert_eq!(fetched.amount, 250.0);
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_newest_first() {
        let store = InMemoryStore::new();
        store
            .upsert(record("a", 1.0, "push", Decision::Approve))
            .await
            .unwrap();
        store
            .upsert(record("b", 2.0, "pull:bank", Decision::ManualReview))
            .await
            .unwrap();
        store
            .upsert(record("c", 3.0, "push", Decision::ManualReview))
            .await
            .unwrap();

        let all = store.list(&TransactionFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|r| r.transaction_id.as_str()).collect::<Vec<_>>(),
            vec!["c", "b", "a"]
        );

        let flagged = store
            .list(&TransactionFilter {
                flagged_only: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(flagged.len(), 2);

        let push_only = store
            .list(&TransactionFilter {
                source: Some("push".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(push_only.len(), 2);
    }

    #[tokio::test]
    async fn test_list_page_size_is_capped() {
        let store = InMemoryStore::new();
        for i in 0..300 {
            store
                .upsert(record(&format!("tx-{i}"), 1.0, "push", Decision::Approve))
                .await
                .unwrap();
        }

        let default_page = store.list(&TransactionFilter::default()).await.unwrap();
        assert_eq!(default_page.len(), 50);

        let oversized = store
            .list(&TransactionFilter {
                limit: Some(1_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(oversized.len(), 200);

        let offset = store
            .list(&TransactionFilter {
                limit: Some(10),
                offset: Some(295),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(offset.len(), 5);
    }
}
