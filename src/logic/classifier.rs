//! Classifier collaborator contract
//!
//! The scoring model is external to this service; the gateway only depends on
//! this adapter trait. A failure is per-call and is never retried here.

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};

/// Score plus explanation returned by the model adapter.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Anomaly score in [0, 1].
    pub score: f64,
    pub risk_factors: Vec<String>,
    pub model_version: String,
}

#[derive(Debug, thiserror::Error)]
#[error("classifier failure: {0}")]
pub struct ClassifierError(pub String);

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Pure with respect to this service's inputs: the same
    /// (amount, timestamp, type) always yields the same score.
    async fn score(
        &self,
        amount: f64,
        timestamp: DateTime<Utc>,
        tx_type: &str,
    ) -> Result<ScoreOutcome, ClassifierError>;
}

/// Deterministic rule-based scorer used when no external model is wired in.
pub struct HeuristicClassifier {
    model_version: String,
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self {
            model_version: "heuristic-v1".to_string(),
        }
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

const HIGH_RISK_TYPES: &[&str] = &["transfer", "withdrawal", "crypto"];

#[async_trait]
impl Classifier for HeuristicClassifier {
    async fn score(
        &self,
        amount: f64,
        timestamp: DateTime<Utc>,
        tx_type: &str,
    ) -> Result<ScoreOutcome, ClassifierError> {
        let mut score: f64 = 0.05;
        let mut risk_factors = Vec::new();

        if amount > 10_000.0 {
            score += 0.45;
            risk_factors.push("large_amount".to_string());
        } else if amount > 1_000.0 {
            score += 0.2;
            risk_factors.push("elevated_amount".to_string());
        }

        let hour = timestamp.hour();
        if !(6..=22).contains(&hour) {
            score += 0.2;
            risk_factors.push("off_hours".to_string());
        }

        if HIGH_RISK_TYPES.contains(&tx_type) {
            score += 0.25;
            risk_factors.push("high_risk_type".to_string());
        }

        Ok(ScoreOutcome {
            score: score.min(1.0),
            risk_factors,
            model_version: self.model_version.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_heuristic_is_deterministic() {
        let classifier = HeuristicClassifier::new();
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();

        let a = classifier.score(500.0, ts, "purchase").await.unwrap();
        let b = classifier.score(500.0, ts, "purchase").await.unwrap();
        assert_eq!(a.score, b.score);
        assert_eq!(a.risk_factors, b.risk_factors);
    }

    #[tokio::test]
    async fn test_heuristic_flags_large_off_hours_transfer() {
        let classifier = HeuristicClassifier::new();
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 3, 0, 0).unwrap();

        let outcome = classifier.score(25_000.0, ts, "transfer").await.unwrap();
        assert!(outcome.score > 0.7);
        assert!(outcome.risk_factors.contains(&"large_amount".to_string()));
        assert!(outcome.risk_factors.contains(&"off_hours".to_string()));
        assert!(outcome.risk_factors.contains(&"high_risk_type".to_string()));
    }

    #[tokio::test]
    async fn test_heuristic_score_stays_in_unit_interval() {
        let classifier = HeuristicClassifier::new();
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 23, 30, 0).unwrap();

        let outcome = classifier.score(1_000_000.0, ts, "crypto").await.unwrap();
        assert!(outcome.score <= 1.0);

        let calm = classifier.score(10.0, ts, "purchase").await.unwrap();
        assert!(calm.score >= 0.0);
    }
}
