// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Store Interfaces
//!
//! Persistence contracts for the two shared stores. The interfaces live in
//! the domain layer and are implemented in `crate::infrastructure::repositories`
//! (in-process and PostgreSQL) and in `hive-sdk` (HTTP, for remote workers).
//!
//! | Trait | Holds | Implementations |
//! |-------|-------|----------------|
//! | `RecordStore` | `Record` | `InMemoryRecordStore`, `PostgresRecordStore`, `HttpRecordStore` |
//! | `ContextStore` | `ContextChunk` | `InMemoryContextStore`, `PostgresContextStore` |
//!
//! ## Failure contract
//!
//! Every call is bounded by the configured call timeout. An unreachable or
//! slow store yields [`StoreError::Connectivity`]; a missing key on `read`
//! yields `Ok(None)`. The two are never conflated.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::context::{ContextChunk, ScoredChunk, UpsertStatus};
use crate::domain::record::Record;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Namespaced key-value storage with a recency index.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Namespace prefix for generated keys and the recency index.
    fn namespace(&self) -> &str;

    /// Store `data` under `key` (or a generated key), replacing any prior
    /// payload and moving the key to the head of the recency index in the
    /// same atomic step. Returns the key.
    async fn write(&self, data: Value, key: Option<String>) -> Result<String, StoreError>;

    /// Read the current payload under `key`.
    async fn read(&self, key: &str) -> Result<Option<Record>, StoreError>;

    /// Scan the newest `window` entries of the recency index and return at
    /// most `limit` whose serialized payload contains `query`
    /// (case-insensitive), newest first.
    async fn search_window(
        &self,
        query: &str,
        window: usize,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError>;

    /// Bounded recency search where the scanned window equals `limit`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Record>, StoreError> {
        self.search_window(query, limit, limit).await
    }

    /// Replace the payload under `key` only if its version is still
    /// `expected_version`. A single atomic conditional write.
    ///
    /// Fails with [`StoreError::Conflict`] when another writer got there
    /// first and [`StoreError::NotFound`] when the key does not exist.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: i64,
        data: Value,
    ) -> Result<Record, StoreError>;

    /// Cheap reachability probe used by health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Relational store of text chunks with ranked retrieval.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Insert or overwrite one chunk keyed by `(source, doc_id, chunk_id)`.
    async fn upsert_chunk(&self, chunk: &ContextChunk) -> Result<UpsertStatus, StoreError>;

    /// Replace every chunk of `(source, doc_id)` with `chunks` in one
    /// transaction: upsert the given chunks and delete any others.
    async fn replace_document(
        &self,
        source: &str,
        doc_id: &str,
        chunks: &[ContextChunk],
    ) -> Result<UpsertStatus, StoreError>;

    /// Candidates whose title matches the query or whose content satisfies
    /// the full-text predicate, scored by content rank plus title boost,
    /// best first, at most `k`.
    async fn ranked_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    /// Case-insensitive substring scan over content, newest first, at most
    /// `k`, every score fixed at zero.
    async fn substring_scan(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, StoreError>;

    /// All chunks stored for one document, ordered by chunk id.
    async fn document_chunks(
        &self,
        source: &str,
        doc_id: &str,
    ) -> Result<Vec<ContextChunk>, StoreError>;

    /// Cheap reachability probe used by health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unreachable: {0}")]
    Connectivity(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Version conflict on '{key}' (expected version {expected})")]
    Conflict { key: String, expected: i64 },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Connectivity failures are retried on the next poll; everything else is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Connectivity(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => StoreError::Connectivity(err.to_string()),
            _ => StoreError::Persistence(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
