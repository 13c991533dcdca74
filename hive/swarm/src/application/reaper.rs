// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lease Reaper - Background task returning abandoned claims to the queue

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hive_core::application::task_queue::TaskQueue;

/// Tasks handled per sweep.
pub const DEFAULT_REAP_BATCH: usize = 100;

pub struct LeaseReaper {
    queue: Arc<TaskQueue>,
    every: Duration,
    batch: usize,
    shutdown_token: CancellationToken,
}

impl LeaseReaper {
    pub fn new(queue: Arc<TaskQueue>, every: Duration) -> Self {
        Self {
            queue,
            every,
            batch: DEFAULT_REAP_BATCH,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown_token = token;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(every = ?self.every, "Starting lease reaper");
        let mut tick = interval(self.every);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match self.queue.reclaim_expired(self.batch).await {
                        Ok(report) if report.is_empty() => debug!("No expired leases"),
                        Ok(report) => info!(
                            requeued = report.requeued.len(),
                            exhausted = report.exhausted.len(),
                            "Lease sweep completed"
                        ),
                        Err(e) => warn!("Lease sweep failed: {}", e),
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping lease reaper");
                    break;
                }
            }
        }
    }
}
