//! Field sanitizer collaborator contract
//!
//! Deterministic, side-effect-free cleanup of free-form transaction metadata
//! before it is persisted or published.

use std::collections::HashMap;

pub trait FieldSanitizer: Send + Sync {
    fn sanitize(
        &self,
        meta: HashMap<String, serde_json::Value>,
    ) -> HashMap<String, serde_json::Value>;
}

/// Redacts values under sensitive-looking keys and truncates oversized
/// string values.
pub struct DefaultSanitizer {
    max_value_len: usize,
}

const SENSITIVE_KEY_PARTS: &[&str] = &["card", "cvv", "pan", "password", "secret", "token", "ssn"];

const REDACTED: &str = "[redacted]";

impl DefaultSanitizer {
    pub fn new() -> Self {
        Self { max_value_len: 512 }
    }

    fn is_sensitive(key: &str) -> bool {
        let lowered = key.to_lowercase();
        SENSITIVE_KEY_PARTS.iter().any(|part| lowered.contains(part))
    }
}

impl Default for DefaultSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldSanitizer for DefaultSanitizer {
    fn sanitize(
        &self,
        meta: HashMap<String, serde_json::Value>,
    ) -> HashMap<String, serde_json::Value> {
        meta.into_iter()
            .map(|(key, value)| {
                if Self::is_sensitive(&key) {
                    return (key, serde_json::Value::String(REDACTED.to_string()));
                }
                let value = match value {
                    serde_json::Value::String(s) if s.chars().count() > self.max_value_len => {
                        serde_json::Value::String(s.chars().take(self.max_value_len).collect())
                    }
                    other => other,
                };
                (key, value)
            })
            .collect()
    }
}
