// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Audit Trail - Application Layer
//!
//! Best-effort event emission. Telemetry must never take a worker down, so
//! `emit` has no error path: a failed write is logged and parked in a
//! bounded buffer that is drained ahead of the next emit.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::event::Event;
use crate::domain::record::unix_now;
use crate::domain::repository::RecordStore;

pub const DEFAULT_BUFFER_CAPACITY: usize = 256;

pub struct AuditTrail {
    store: Arc<dyn RecordStore>,
    buffer: Mutex<VecDeque<Event>>,
    capacity: usize,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn RecordStore>, capacity: usize) -> Self {
        Self {
            store,
            buffer: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Record an event. Returns the key it was stored under, or `None` if
    /// the store was unavailable.
    pub async fn emit(&self, agent: &str, event_type: &str, topic: &str, payload: Value) -> Option<String> {
        self.flush().await;
        self.record(Event::new(agent, event_type, topic, payload, unix_now())).await
    }

    pub async fn heartbeat(&self, agent: &str) -> Option<String> {
        self.flush().await;
        self.record(Event::heartbeat(agent, unix_now())).await
    }

    pub async fn lifecycle(&self, agent: &str, status: &str) -> Option<String> {
        self.flush().await;
        self.record(Event::lifecycle(agent, status, unix_now())).await
    }

    /// Retry buffered events oldest first, stopping at the first failure.
    /// Returns how many were written.
    pub async fn flush(&self) -> usize {
        let mut written = 0;
        loop {
            let Some(event) = self.next_buffered() else {
                break;
            };
            let data = match serde_json::to_value(&event) {
                Ok(data) => data,
                Err(e) => {
                    warn!(error = %e, "Dropping unserializable audit event");
                    continue;
                }
            };
            match self.store.write(data, None).await {
                Ok(_) => written += 1,
                Err(e) => {
                    debug!(error = %e, "Audit store still unavailable");
                    self.buffer.lock().push_front(event);
                    break;
                }
            }
        }
        if written > 0 {
            debug!(written, "Flushed buffered audit events");
        }
        written
    }

    /// Events waiting for the store to come back.
    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    async fn record(&self, event: Event) -> Option<String> {
        let data = match serde_json::to_value(&event) {
            Ok(data) => data,
            Err(e) => {
                warn!(agent = %event.agent, topic = %event.topic, error = %e, "Failed to serialize audit event");
                return None;
            }
        };
        match self.store.write(data, None).await {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(agent = %event.agent, topic = %event.topic, error = %e, "Failed to emit audit event");
                self.park(event);
                None
            }
        }
    }

    fn next_buffered(&self) -> Option<Event> {
        self.buffer.lock().pop_front()
    }

    fn park(&self, event: Event) {
        if self.capacity == 0 {
            metrics::counter!("hive_audit_dropped_total").increment(1);
            return;
        }
        let mut buffer = self.buffer.lock();
        while buffer.len() >= self.capacity {
            if let Some(dropped) = buffer.pop_front() {
                warn!(agent = %dropped.agent, topic = %dropped.topic, "Audit buffer full, dropping oldest event");
                metrics::counter!("hive_audit_dropped_total").increment(1);
            }
        }
        buffer.push_back(event);
    }
}
