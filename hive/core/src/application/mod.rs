// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod audit_trail;
pub mod context_index;
pub mod ingest;
pub mod repository_factory;
pub mod task_queue;

pub use audit_trail::AuditTrail;
pub use context_index::{ContextAck, ContextIndex, ContextService, UpsertRequest};
pub use ingest::{DocumentIngestor, IngestReport};
pub use task_queue::{ReapReport, TaskQueue, TaskQueueError};
