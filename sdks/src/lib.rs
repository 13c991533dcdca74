// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Hive Rust SDK
//!
//! HTTP access to a running hive server. [`HiveClient`] speaks the wire
//! protocol directly; [`HttpRecordStore`] and [`HttpContextService`] wrap it
//! in the same traits the server uses, so a `TaskQueue` or `AuditTrail`
//! built over them behaves exactly as it would in-process.

pub mod client;
pub mod error;
pub mod remote;

pub use client::HiveClient;
pub use error::ClientError;
pub use remote::{HttpContextService, HttpRecordStore};
