// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Polling Worker - Background task executing queued work for one role
//!
//! Each cycle: heartbeat when due, fetch pending tasks for the role, claim
//! each one, dispatch it to the registered handler and record the result
//! with an owner-checked completion. Failures inside a cycle are logged and
//! the next cycle tries again; nothing short of the shutdown token stops
//! the loop.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Drive `TaskQueue` on behalf of one worker identity

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hive_core::application::audit_trail::AuditTrail;
use hive_core::application::task_queue::{TaskQueue, TaskQueueError};
use hive_core::domain::config::HiveConfig;
use hive_core::domain::event::EVENT_TYPE;
use hive_core::domain::task::QueuedTask;

use crate::domain::HandlerRegistry;

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Role whose tasks this worker serves (`assigned_to`).
    pub role: String,
    /// Identity recorded as `claimed_by` and as the audit agent.
    pub worker_id: String,
    pub poll_interval: Duration,
    pub heartbeat_every: Duration,
    /// Pending tasks fetched per cycle.
    pub batch_size: usize,
}

impl WorkerSettings {
    pub fn from_config(role: impl Into<String>, worker_id: impl Into<String>, config: &HiveConfig) -> Self {
        Self {
            role: role.into(),
            worker_id: worker_id.into(),
            poll_interval: config.poll_interval,
            heartbeat_every: config.worker.heartbeat_every,
            batch_size: config.worker.batch_size,
        }
    }
}

/// Tally of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub claimed: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Outcome {
    /// Another worker claimed it first.
    Lost,
    Completed,
    Skipped,
    Failed,
}

pub struct PollingWorker {
    settings: WorkerSettings,
    queue: Arc<TaskQueue>,
    audit: Arc<AuditTrail>,
    registry: HandlerRegistry,
    shutdown_token: CancellationToken,
}

impl PollingWorker {
    pub fn new(
        settings: WorkerSettings,
        queue: Arc<TaskQueue>,
        audit: Arc<AuditTrail>,
        registry: HandlerRegistry,
    ) -> Self {
        Self {
            settings,
            queue,
            audit,
            registry,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Use an externally owned token, e.g. one shared with a server.
    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    /// Start the worker background task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Poll until the shutdown token is cancelled. A cycle in progress is
    /// finished before the loop exits.
    pub async fn run(&self) {
        let agent = self.settings.worker_id.as_str();
        info!(
            role = %self.settings.role,
            worker = agent,
            poll_interval = ?self.settings.poll_interval,
            handlers = ?self.registry.task_types(),
            "Starting polling worker"
        );
        self.audit.lifecycle(agent, "starting").await;

        let mut tick = interval(self.settings.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_heartbeat: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if last_heartbeat.is_none_or(|at| at.elapsed() >= self.settings.heartbeat_every) {
                        self.audit.heartbeat(agent).await;
                        last_heartbeat = Some(Instant::now());
                    }

                    match self.poll_once().await {
                        Ok(report) if report.claimed > 0 => {
                            info!(
                                claimed = report.claimed,
                                completed = report.completed,
                                skipped = report.skipped,
                                failed = report.failed,
                                "Worker cycle completed"
                            );
                        }
                        Ok(_) => debug!("No work claimed this cycle"),
                        Err(e) if e.is_transient() => {
                            warn!("Worker cycle failed, retrying next poll: {}", e);
                        }
                        Err(e) => warn!("Worker cycle failed: {}", e),
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping polling worker");
                    break;
                }
            }
        }

        self.audit.lifecycle(agent, "stopped").await;
        info!(worker = agent, "Polling worker stopped");
    }

    /// One discovery-and-execute pass. Errors on individual tasks are
    /// logged and do not stop the pass.
    pub async fn poll_once(&self) -> Result<PollReport, TaskQueueError> {
        let pending = self
            .queue
            .find_pending(&self.settings.role, self.settings.batch_size)
            .await?;
        let mut report = PollReport::default();

        for queued in pending {
            if self.shutdown_token.is_cancelled() {
                break;
            }
            let tally = match self.process(&queued).await {
                Ok(Outcome::Lost) => continue,
                Ok(Outcome::Completed) => &mut report.completed,
                Ok(Outcome::Skipped) => &mut report.skipped,
                Ok(Outcome::Failed) => &mut report.failed,
                Err(e) => {
                    warn!(key = %queued.key, "Failed to process task: {}", e);
                    continue;
                }
            };
            *tally += 1;
            report.claimed += 1;
        }
        Ok(report)
    }

    async fn process(&self, queued: &QueuedTask) -> Result<Outcome, TaskQueueError> {
        let worker = self.settings.worker_id.as_str();
        let key = queued.key.as_str();
        let Some(task) = self.queue.claim(key, worker).await? else {
            return Ok(Outcome::Lost);
        };

        let (result, outcome) = match self.registry.get(&task.task_type) {
            None => {
                debug!(key, task_type = %task.task_type, "No handler registered");
                (json!({"status": "skipped", "reason": "no_handler"}), Outcome::Skipped)
            }
            Some(handler) => match timeout(self.queue.config().lease, handler.handle(&task)).await {
                Ok(Ok(result)) => (result, Outcome::Completed),
                Ok(Err(e)) => (json!({"status": "error", "error": e.to_string()}), Outcome::Failed),
                Err(_) => (
                    json!({"status": "error", "error": "handler exceeded the claim lease"}),
                    Outcome::Failed,
                ),
            },
        };

        if self.queue.complete_as(key, worker, result.clone()).await?.is_none() {
            warn!(key, worker, "Claim was lost before completion, result discarded");
            return Ok(Outcome::Lost);
        }

        if matches!(outcome, Outcome::Failed) {
            metrics::counter!("hive_handler_failures_total").increment(1);
        }
        let (topic, payload): (&str, Value) = match outcome {
            Outcome::Failed => ("error", json!({"task_key": key, "err": result.get("error").cloned()})),
            _ => ("exec", json!({"task_key": key, "task_type": task.task_type, "result": result})),
        };
        self.audit.emit(worker, EVENT_TYPE, topic, payload).await;
        Ok(outcome)
    }
}
