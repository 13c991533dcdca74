// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates concrete store implementations based on the storage backend
//! configuration, keeping the domain layer free of infrastructure types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Select and wire store implementations

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::info;

use crate::domain::config::HiveConfig;
use crate::domain::repository::{ContextStore, RecordStore, StorageBackend, StoreError};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::{
    InMemoryContextStore, InMemoryRecordStore, PostgresContextStore, PostgresRecordStore,
};

/// Creates a RecordStore implementation based on the configured backend
pub fn create_record_store(
    backend: &StorageBackend,
    pool: Option<PgPool>,
    namespace: &str,
    call_timeout: Duration,
) -> Result<Arc<dyn RecordStore>, StoreError> {
    match (backend, pool) {
        (StorageBackend::InMemory, _) => Ok(Arc::new(InMemoryRecordStore::new(namespace))),
        (StorageBackend::PostgreSQL(_), Some(pool)) => {
            Ok(Arc::new(PostgresRecordStore::new(pool, namespace, call_timeout)))
        }
        (StorageBackend::PostgreSQL(_), None) => Err(missing_pool()),
    }
}

/// Creates a ContextStore implementation based on the configured backend
pub fn create_context_store(
    backend: &StorageBackend,
    pool: Option<PgPool>,
    call_timeout: Duration,
) -> Result<Arc<dyn ContextStore>, StoreError> {
    match (backend, pool) {
        (StorageBackend::InMemory, _) => Ok(Arc::new(InMemoryContextStore::new())),
        (StorageBackend::PostgreSQL(_), Some(pool)) => {
            Ok(Arc::new(PostgresContextStore::new(pool, call_timeout)))
        }
        (StorageBackend::PostgreSQL(_), None) => Err(missing_pool()),
    }
}

fn missing_pool() -> StoreError {
    StoreError::Connectivity("PostgreSQL backend selected but no connection pool available".to_string())
}

/// Both stores for one host, plus the pool when running on PostgreSQL.
#[derive(Clone)]
pub struct StoreSet {
    pub records: Arc<dyn RecordStore>,
    pub context: Arc<dyn ContextStore>,
    pub database: Option<Database>,
}

impl StoreSet {
    /// Open the configured backend. Connects (and, with `auto_migrate`,
    /// migrates) PostgreSQL when selected.
    pub async fn open(config: &HiveConfig) -> Result<Self, StoreError> {
        let backend = config
            .storage_backend()
            .map_err(|e| StoreError::MalformedInput(e.to_string()))?;

        let database = match &backend {
            StorageBackend::InMemory => None,
            StorageBackend::PostgreSQL(pg) => {
                let db = Database::new(&pg.connection_string, pg.max_connections, config.call_timeout).await?;
                if config.storage.auto_migrate {
                    db.migrate().await?;
                    info!("Database migrations applied");
                }
                Some(db)
            }
        };

        let pool = database.as_ref().map(|db| db.get_pool().clone());
        let records = create_record_store(&backend, pool.clone(), &config.namespace, config.call_timeout)?;
        let context = create_context_store(&backend, pool, config.call_timeout)?;
        info!(backend = ?config.storage.backend, namespace = %config.namespace, "Stores ready");

        Ok(Self {
            records,
            context,
            database,
        })
    }

    /// In-memory stores bound to `namespace`.
    pub fn in_memory(namespace: &str) -> Self {
        Self {
            records: Arc::new(InMemoryRecordStore::new(namespace)),
            context: Arc::new(InMemoryContextStore::new()),
            database: None,
        }
    }
}
