// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Record Aggregate
//!
//! A [`Record`] is a uniquely keyed, opaque JSON payload held by a
//! [`RecordStore`](crate::domain::repository::RecordStore). Writes under an
//! existing key replace the payload wholesale and bump the record's
//! `version`; the version is what compare-and-swap writes are conditioned on.
//!
//! Search over records is a bounded recency scan: only the newest `window`
//! entries of the namespace's recency index are considered, and a record
//! matches when the query is a case-insensitive substring of its compact JSON
//! serialization (see [`payload_matches`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored payload together with its recency and version metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Globally unique key, namespace prefix included.
    pub key: String,
    /// Opaque document supplied by the writer.
    pub payload: Value,
    /// Time of the most recent write. Orders the recency index.
    pub ts: DateTime<Utc>,
    /// Starts at 1 and increases by one on every replacement.
    pub version: i64,
}

impl Record {
    /// Write time as fractional UNIX seconds, the wire representation workers expect.
    pub fn ts_seconds(&self) -> f64 {
        to_unix_seconds(self.ts)
    }
}

/// Generate a fresh key inside `namespace`.
pub fn generate_key(namespace: &str) -> String {
    format!("{}:{}", namespace, uuid::Uuid::new_v4().simple())
}

/// Case-insensitive substring test against the compact serialization of `payload`.
///
/// `needle_lower` must already be lowercased; callers scanning many records
/// lowercase the query once.
pub fn payload_matches(payload: &Value, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    match serde_json::to_string(payload) {
        Ok(serialized) => serialized.to_lowercase().contains(needle_lower),
        Err(_) => false,
    }
}

/// Current time as fractional UNIX seconds.
pub fn unix_now() -> f64 {
    to_unix_seconds(Utc::now())
}

pub fn to_unix_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

/// Inverse of [`to_unix_seconds`]; out-of-range input clamps to the epoch.
pub fn from_unix_seconds(secs: f64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_keys_are_namespaced_and_unique() {
        let a = generate_key("nova:mem");
        let b = generate_key("nova:mem");
        assert!(a.starts_with("nova:mem:"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_payload_match_is_case_insensitive() {
        let payload = json!({"agent": "TrendFetcher", "topic": "Heartbeat"});
        assert!(payload_matches(&payload, "trendfetcher"));
        assert!(payload_matches(&payload, "\"topic\":\"heartbeat\""));
        assert!(!payload_matches(&payload, "lifecycle"));
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(payload_matches(&json!({"a": 1}), ""));
    }

    #[test]
    fn test_unix_seconds_conversion_is_reversible() {
        let now = Utc::now();
        let back = from_unix_seconds(to_unix_seconds(now));
        assert_eq!(back.timestamp_micros(), now.timestamp_micros());
    }
}
