// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Task Queue - Application Layer
//!
//! Tasks are records in the shared [`RecordStore`] under
//! `<namespace>:task:<task_id>`. There is no central scheduler: every worker
//! discovers its own work with [`TaskQueue::find_pending`] and races for it
//! with [`TaskQueue::claim`].
//!
//! Every state change is a read followed by a compare-and-swap on the
//! record version. When two workers read the same pending task, exactly one
//! swap succeeds; the loser re-reads, sees the task claimed and backs off.
//!
//! Claims carry a lease. A worker that dies mid-task leaves a claim whose
//! lease eventually expires; the task is then claimable again, and
//! [`TaskQueue::reclaim_expired`] sweeps such tasks back to `pending` (or
//! closes them once they have used up their attempts).
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Enqueue, discover, claim and complete tasks

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::domain::config::QueueConfig;
use crate::domain::record::{unix_now, Record};
use crate::domain::repository::{RecordStore, StoreError};
use crate::domain::task::{QueuedTask, Task, TaskStatus};

/// Compare-and-swap attempts per state change before giving up.
const CAS_RETRIES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum TaskQueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Queue for role '{role}' is full ({depth} pending)")]
    QueueFull { role: String, depth: usize },
}

impl TaskQueueError {
    pub fn is_transient(&self) -> bool {
        match self {
            TaskQueueError::Store(e) => e.is_transient(),
            TaskQueueError::QueueFull { .. } => true,
        }
    }
}

impl From<serde_json::Error> for TaskQueueError {
    fn from(err: serde_json::Error) -> Self {
        TaskQueueError::Store(err.into())
    }
}

/// Outcome of one expired-lease sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReapReport {
    /// Keys returned to `pending`.
    pub requeued: Vec<String>,
    /// Keys closed as failed after exhausting their attempts.
    pub exhausted: Vec<String>,
}

impl ReapReport {
    pub fn is_empty(&self) -> bool {
        self.requeued.is_empty() && self.exhausted.is_empty()
    }
}

pub struct TaskQueue {
    store: Arc<dyn RecordStore>,
    config: QueueConfig,
}

impl TaskQueue {
    pub fn new(store: Arc<dyn RecordStore>, config: QueueConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn task_key(&self, task_id: &str) -> String {
        format!("{}:task:{}", self.store.namespace(), task_id)
    }

    pub async fn enqueue(
        &self,
        task_type: &str,
        payload: Value,
        assigned_to: &str,
        created_by: &str,
    ) -> Result<String, TaskQueueError> {
        if task_type.trim().is_empty() {
            return Err(StoreError::MalformedInput("task_type must not be empty".to_string()).into());
        }
        if assigned_to.trim().is_empty() {
            return Err(StoreError::MalformedInput("assigned_to must not be empty".to_string()).into());
        }

        if let Some(max) = self.config.max_pending_per_role {
            let depth = self.find_pending(assigned_to, max).await?.len();
            if depth >= max {
                warn!(role = assigned_to, depth, "Rejecting task: queue full");
                return Err(TaskQueueError::QueueFull {
                    role: assigned_to.to_string(),
                    depth,
                });
            }
        }

        let task = Task::new(task_type, payload, assigned_to, created_by, unix_now());
        let key = self.task_key(&task.task_id);
        self.store.write(task.to_payload()?, Some(key.clone())).await?;

        metrics::counter!("hive_tasks_enqueued_total").increment(1);
        info!(key = %key, task_type, assigned_to, created_by, "Task enqueued");
        Ok(key)
    }

    /// Pending tasks assigned to `role`, newest first.
    ///
    /// Only the newest `pending_scan_window` records are inspected, so a task
    /// buried under a burst of newer writes is not visible until it resurfaces.
    pub async fn find_pending(&self, role: &str, limit: usize) -> Result<Vec<QueuedTask>, TaskQueueError> {
        let needle = format!("\"assigned_to\":{}", serde_json::to_string(role)?);
        let window = self.config.pending_scan_window;
        let records = self.store.search_window(&needle, window, window).await?;

        Ok(records
            .into_iter()
            .filter_map(decode)
            .filter(|queued| {
                queued.task.status == TaskStatus::Pending && queued.task.assigned_to == role
            })
            .take(limit)
            .collect())
    }

    /// Load a task by key. A record that is not a task is malformed input.
    pub async fn get(&self, key: &str) -> Result<Option<QueuedTask>, TaskQueueError> {
        match self.store.read(key).await? {
            Some(record) => Ok(Some(QueuedTask {
                task: Task::from_payload(&record.payload)?,
                key: record.key,
            })),
            None => Ok(None),
        }
    }

    /// Take ownership of a task. Returns `None` when the task is missing,
    /// not claimable, or another claimer won the race.
    pub async fn claim(&self, key: &str, claimer: &str) -> Result<Option<Task>, TaskQueueError> {
        if claimer.trim().is_empty() {
            return Err(StoreError::MalformedInput("claimer must not be empty".to_string()).into());
        }

        for _ in 0..CAS_RETRIES {
            let Some((record, mut task)) = self.load(key).await? else {
                return Ok(None);
            };

            let now = unix_now();
            if !task.is_claimable(now) {
                debug!(key, status = %task.status, "Task not claimable");
                return Ok(None);
            }
            let takeover = task.status == TaskStatus::Claimed;
            if takeover && task.attempts >= self.config.max_attempts {
                debug!(key, attempts = task.attempts, "Expired task has no attempts left");
                return Ok(None);
            }

            let previous_owner = task.claimed_by.clone();
            task.claim(claimer, now, self.config.lease);
            match self.swap(&record, &task).await? {
                true => {
                    metrics::counter!("hive_tasks_claimed_total").increment(1);
                    if takeover {
                        warn!(key, claimer, previous_owner = ?previous_owner, attempts = task.attempts,
                            "Claimed task after lease expiry");
                    } else {
                        info!(key, claimer, "Task claimed");
                    }
                    return Ok(Some(task));
                }
                false => {
                    metrics::counter!("hive_claim_conflicts_total").increment(1);
                    debug!(key, claimer, "Claim lost a race, re-reading");
                }
            }
        }
        Ok(None)
    }

    /// Mark a task done with `result`, whoever holds it. Returns `None` when
    /// the task is missing or already done.
    pub async fn complete(&self, key: &str, result: Value) -> Result<Option<Task>, TaskQueueError> {
        self.finish(key, None, result).await
    }

    /// Mark a task done only if `worker` currently holds the claim.
    pub async fn complete_as(
        &self,
        key: &str,
        worker: &str,
        result: Value,
    ) -> Result<Option<Task>, TaskQueueError> {
        self.finish(key, Some(worker), result).await
    }

    async fn finish(
        &self,
        key: &str,
        owner: Option<&str>,
        result: Value,
    ) -> Result<Option<Task>, TaskQueueError> {
        for _ in 0..CAS_RETRIES {
            let Some((record, mut task)) = self.load(key).await? else {
                return Ok(None);
            };
            if task.status == TaskStatus::Done {
                debug!(key, "Task already done");
                return Ok(None);
            }
            if let Some(worker) = owner {
                if !task.is_claimed_by(worker) {
                    warn!(key, worker, claimed_by = ?task.claimed_by, "Refusing completion by non-owner");
                    return Ok(None);
                }
            }

            task.complete(result.clone(), unix_now());
            if self.swap(&record, &task).await? {
                metrics::counter!("hive_tasks_completed_total").increment(1);
                info!(key, "Task completed");
                return Ok(Some(task));
            }
        }
        Ok(None)
    }

    /// Return tasks whose lease expired to `pending`, or close them with a
    /// `lease_exhausted` error once they reached `max_attempts`. Handles at
    /// most `limit` tasks per call.
    pub async fn reclaim_expired(&self, limit: usize) -> Result<ReapReport, TaskQueueError> {
        let window = self.config.pending_scan_window;
        let records = self.store.search_window("\"status\":\"claimed\"", window, window).await?;
        let now = unix_now();
        let mut report = ReapReport::default();

        for record in records {
            if report.requeued.len() + report.exhausted.len() >= limit {
                break;
            }
            let Ok(mut task) = Task::from_payload(&record.payload) else {
                continue;
            };
            if !task.is_lease_expired(now) {
                continue;
            }

            let exhausted = task.attempts >= self.config.max_attempts;
            if exhausted {
                task.complete(json!({"status": "error", "reason": "lease_exhausted"}), now);
            } else {
                task.release();
            }

            match self.swap(&record, &task).await {
                Ok(true) if exhausted => {
                    warn!(key = %record.key, attempts = task.attempts, "Task exhausted its attempts");
                    metrics::counter!("hive_tasks_completed_total").increment(1);
                    report.exhausted.push(record.key);
                }
                Ok(true) => {
                    info!(key = %record.key, attempts = task.attempts, "Requeued task after lease expiry");
                    report.requeued.push(record.key);
                }
                // Someone claimed or completed it in the meantime.
                Ok(false) => {}
                Err(e) => warn!(key = %record.key, error = %e, "Failed to reclaim task"),
            }
        }
        Ok(report)
    }

    async fn load(&self, key: &str) -> Result<Option<(Record, Task)>, TaskQueueError> {
        let Some(record) = self.store.read(key).await? else {
            return Ok(None);
        };
        match Task::from_payload(&record.payload) {
            Ok(task) => Ok(Some((record, task))),
            Err(e) => {
                debug!(key, error = %e, "Record is not a task");
                Ok(None)
            }
        }
    }

    /// `true` if the swap landed, `false` if the record changed underneath.
    async fn swap(&self, read: &Record, task: &Task) -> Result<bool, TaskQueueError> {
        match self
            .store
            .compare_and_swap(&read.key, read.version, task.to_payload()?)
            .await
        {
            Ok(_) => Ok(true),
            Err(StoreError::Conflict { .. }) | Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn decode(record: Record) -> Option<QueuedTask> {
    let task = Task::from_payload(&record.payload).ok()?;
    Some(QueuedTask { key: record.key, task })
}
