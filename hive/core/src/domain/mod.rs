// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain
//!
//! Records, tasks, context chunks and audit events, plus the store
//! contracts they are persisted through.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and invariants; no I/O

pub mod chunking;
pub mod config;
pub mod context;
pub mod event;
pub mod ingest;
pub mod record;
pub mod repository;
pub mod task;
