// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Connection Pool
//!
//! Wraps `sqlx::postgres::PgPool` in a thin `Database` newtype that is
//! injected into the PostgreSQL store implementations. Schema migrations are
//! embedded at compile time from `hive/core/migrations`.

use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgPool, PgPoolOptions};
use url::Url;

use crate::domain::repository::StoreError;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect a pool. `acquire_timeout` bounds how long a call waits for a
    /// connection, so an unreachable server surfaces as a connectivity error.
    pub async fn new(
        connection_string: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let url = with_sslmode(connection_string)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(&url)
            .await
            .map_err(|e| StoreError::Connectivity(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, or callers that manage their own).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply every pending embedded migration.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Persistence(format!("Migration failed: {}", e)))
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Append `sslmode=require` to a connection string that names no `sslmode`,
/// unless it points at a local server.
pub fn with_sslmode(connection_string: &str) -> Result<String, StoreError> {
    let mut url = Url::parse(connection_string.trim())
        .map_err(|e| StoreError::MalformedInput(format!("invalid database url: {}", e)))?;

    if url.query_pairs().any(|(name, _)| name == "sslmode") {
        return Ok(url.to_string());
    }
    let local = matches!(
        url.host_str(),
        None | Some("localhost") | Some("127.0.0.1") | Some("::1") | Some("[::1]")
    );
    if !local {
        url.query_pairs_mut().append_pair("sslmode", "require");
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_url_gets_sslmode() {
        let url = with_sslmode("postgres://hive:pw@db.example.com:5432/hive").unwrap();
        assert!(url.ends_with("?sslmode=require"), "{}", url);

        let url = with_sslmode("postgres://hive@db.example.com/hive?application_name=hive").unwrap();
        assert!(url.contains("application_name=hive&sslmode=require"), "{}", url);
    }

    #[test]
    fn test_explicit_sslmode_is_kept() {
        let url = with_sslmode("postgres://db.example.com/hive?sslmode=disable").unwrap();
        assert!(url.contains("sslmode=disable"));
        assert!(!url.contains("sslmode=require"));
    }

    #[test]
    fn test_local_url_is_untouched() {
        let url = with_sslmode("postgres://hive@localhost/hive").unwrap();
        assert!(!url.contains("sslmode"));
    }

    #[test]
    fn test_garbage_url_is_malformed() {
        assert!(matches!(with_sslmode("not a url"), Err(StoreError::MalformedInput(_))));
    }
}
