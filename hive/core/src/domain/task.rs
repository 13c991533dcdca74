// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Aggregate
//!
//! A task is a record whose payload models one unit of work:
//!
//! ```text
//! pending ──claim──▶ claimed ──complete──▶ done
//!    ▲                  │
//!    └──lease expired───┘   (reaper, or a fresh claim)
//! ```
//!
//! The payload layout is the one every worker already reads and writes
//! (`type`, `status`, `task_type`, `assigned_to`, … with float UNIX-second
//! timestamps), extended with `lease_expires_ts` and `attempts` so that a
//! worker dying mid-claim does not strand the task forever.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::domain::repository::StoreError;

/// Value of the payload's `type` field for task records.
pub const TASK_RECORD_TYPE: &str = "task";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Claimed,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Claimed => "claimed",
            TaskStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "type")]
    pub record_type: String,
    pub status: TaskStatus,
    pub task_type: String,
    pub assigned_to: String,
    pub created_by: String,
    #[serde(default)]
    pub payload: Value,
    pub task_id: String,
    pub ts: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_ts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_expires_ts: Option<f64>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_ts: Option<f64>,
}

impl Task {
    pub fn new(
        task_type: impl Into<String>,
        payload: Value,
        assigned_to: impl Into<String>,
        created_by: impl Into<String>,
        now: f64,
    ) -> Self {
        Self {
            record_type: TASK_RECORD_TYPE.to_string(),
            status: TaskStatus::Pending,
            task_type: task_type.into(),
            assigned_to: assigned_to.into(),
            created_by: created_by.into(),
            payload,
            task_id: uuid::Uuid::new_v4().simple().to_string(),
            ts: now,
            claimed_by: None,
            claimed_ts: None,
            lease_expires_ts: None,
            attempts: 0,
            result: None,
            done_ts: None,
        }
    }

    /// Decode a record payload. Payloads that are not tasks are malformed.
    pub fn from_payload(payload: &Value) -> Result<Self, StoreError> {
        let task: Task = serde_json::from_value(payload.clone())
            .map_err(|e| StoreError::MalformedInput(format!("not a task record: {}", e)))?;
        if task.record_type != TASK_RECORD_TYPE {
            return Err(StoreError::MalformedInput(format!(
                "record type is '{}', expected '{}'",
                task.record_type, TASK_RECORD_TYPE
            )));
        }
        Ok(task)
    }

    pub fn to_payload(&self) -> Result<Value, StoreError> {
        Ok(serde_json::to_value(self)?)
    }

    /// A claim whose lease ran out is treated as abandoned.
    pub fn is_lease_expired(&self, now: f64) -> bool {
        self.status == TaskStatus::Claimed
            && self.lease_expires_ts.map(|expires| now >= expires).unwrap_or(false)
    }

    pub fn is_claimable(&self, now: f64) -> bool {
        self.status == TaskStatus::Pending || self.is_lease_expired(now)
    }

    pub fn is_claimed_by(&self, worker: &str) -> bool {
        self.status == TaskStatus::Claimed && self.claimed_by.as_deref() == Some(worker)
    }

    /// Transition to `claimed`. Caller must have checked [`Task::is_claimable`].
    pub fn claim(&mut self, claimer: &str, now: f64, lease: Duration) {
        self.status = TaskStatus::Claimed;
        self.claimed_by = Some(claimer.to_string());
        self.claimed_ts = Some(now);
        self.lease_expires_ts = Some(now + lease.as_secs_f64());
        self.attempts += 1;
    }

    pub fn complete(&mut self, result: Value, now: f64) {
        self.status = TaskStatus::Done;
        self.result = Some(result);
        self.done_ts = Some(now);
        self.lease_expires_ts = None;
    }

    /// Return an abandoned claim to the queue. `attempts` is kept so the
    /// reaper can give up on tasks that keep killing their workers.
    pub fn release(&mut self) {
        self.status = TaskStatus::Pending;
        self.claimed_by = None;
        self.claimed_ts = None;
        self.lease_expires_ts = None;
    }
}

/// A task together with the record key it lives under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedTask {
    pub key: String,
    pub task: Task,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pending() -> Task {
        Task::new("publish_artifact", json!({"artifact": {}}), "Executor", "Planner", 1_000.0)
    }

    #[test]
    fn test_serialized_layout_matches_worker_format() {
        let task = pending();
        let payload = task.to_payload().unwrap();
        assert_eq!(payload["type"], "task");
        assert_eq!(payload["status"], "pending");
        assert_eq!(payload["assigned_to"], "Executor");
        assert!(payload.get("claimed_by").is_none());

        let compact = serde_json::to_string(&payload).unwrap();
        assert!(compact.contains("\"assigned_to\":\"Executor\""));
    }

    #[test]
    fn test_claim_sets_lease_and_counts_attempts() {
        let mut task = pending();
        task.claim("W1", 1_000.0, Duration::from_secs(30));
        assert_eq!(task.status, TaskStatus::Claimed);
        assert_eq!(task.lease_expires_ts, Some(1_030.0));
        assert_eq!(task.attempts, 1);
        assert!(task.is_claimed_by("W1"));
        assert!(!task.is_claimed_by("W2"));
    }

    #[test]
    fn test_expired_claim_is_claimable_again() {
        let mut task = pending();
        task.claim("W1", 1_000.0, Duration::from_secs(30));
        assert!(!task.is_claimable(1_029.0));
        assert!(task.is_claimable(1_030.0));
    }

    #[test]
    fn test_done_is_never_claimable() {
        let mut task = pending();
        task.claim("W1", 1_000.0, Duration::from_secs(30));
        task.complete(json!({"status": "published"}), 1_001.0);
        assert!(!task.is_claimable(f64::MAX));
        assert!(!task.is_lease_expired(f64::MAX));
    }

    #[test]
    fn test_non_task_payload_is_rejected() {
        let err = Task::from_payload(&json!({"agent": "x", "type": "event"})).unwrap_err();
        assert!(matches!(err, StoreError::MalformedInput(_)));
    }

    #[test]
    fn test_legacy_payload_without_lease_fields_decodes() {
        let payload = json!({
            "type": "task", "status": "pending", "task_type": "publish_artifact",
            "assigned_to": "Executor", "created_by": "Planner", "payload": {},
            "ts": 1.5, "task_id": "abc"
        });
        let task = Task::from_payload(&payload).unwrap();
        assert_eq!(task.attempts, 0);
        assert!(task.lease_expires_ts.is_none());
    }
}
