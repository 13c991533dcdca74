// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Record Store
//!
//! `RecordStore` backed by the `records` table. Payload, version and recency
//! sequence change in a single statement, so a reader can never observe a
//! payload whose recency entry is stale.
//!
//! Substring search fetches the newest `window` rows of the namespace and
//! filters the compact JSON in Rust, which keeps matching identical to the
//! in-memory store.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::{bounded, sql_limit};
use crate::domain::record::{generate_key, payload_matches, Record};
use crate::domain::repository::{RecordStore, StoreError};

pub struct PostgresRecordStore {
    pool: PgPool,
    namespace: String,
    call_timeout: Duration,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool, namespace: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
            call_timeout,
        }
    }

    fn row_to_record(row: &PgRow) -> Result<Record, StoreError> {
        Ok(Record {
            key: row.try_get("key")?,
            payload: row.try_get("payload")?,
            ts: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        })
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn write(&self, data: Value, key: Option<String>) -> Result<String, StoreError> {
        let key = match key {
            Some(key) if key.trim().is_empty() => {
                return Err(StoreError::MalformedInput("key must not be empty".to_string()))
            }
            Some(key) => key,
            None => generate_key(&self.namespace),
        };

        bounded(self.call_timeout, "record write", async {
            sqlx::query(
                r#"
                INSERT INTO records (key, namespace, payload)
                VALUES ($1, $2, $3)
                ON CONFLICT (key) DO UPDATE SET
                    payload = EXCLUDED.payload,
                    namespace = EXCLUDED.namespace,
                    version = records.version + 1,
                    seq = EXCLUDED.seq,
                    updated_at = now()
                "#,
            )
            .bind(&key)
            .bind(&self.namespace)
            .bind(&data)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await?;

        Ok(key)
    }

    async fn read(&self, key: &str) -> Result<Option<Record>, StoreError> {
        bounded(self.call_timeout, "record read", async {
            let row = sqlx::query(
                r#"
                SELECT key, payload, version, updated_at
                FROM records
                WHERE key = $1
                "#,
            )
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

            row.as_ref().map(Self::row_to_record).transpose()
        })
        .await
    }

    async fn search_window(
        &self,
        query: &str,
        window: usize,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let needle = query.to_lowercase();
        bounded(self.call_timeout, "record search", async {
            let rows = sqlx::query(
                r#"
                SELECT key, payload, version, updated_at
                FROM records
                WHERE namespace = $1
                ORDER BY seq DESC
                LIMIT $2
                "#,
            )
            .bind(&self.namespace)
            .bind(sql_limit(window))
            .fetch_all(&self.pool)
            .await?;

            let mut results = Vec::new();
            for row in &rows {
                if results.len() >= limit {
                    break;
                }
                let record = Self::row_to_record(row)?;
                if payload_matches(&record.payload, &needle) {
                    results.push(record);
                }
            }
            Ok(results)
        })
        .await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: i64,
        data: Value,
    ) -> Result<Record, StoreError> {
        bounded(self.call_timeout, "record compare-and-swap", async {
            let row = sqlx::query(
                r#"
                UPDATE records SET
                    payload = $3,
                    version = version + 1,
                    seq = nextval('records_recency_seq'),
                    updated_at = now()
                WHERE key = $1 AND version = $2
                RETURNING key, payload, version, updated_at
                "#,
            )
            .bind(key)
            .bind(expected_version)
            .bind(&data)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(row) = row {
                return Self::row_to_record(&row);
            }

            // Nothing updated: either the key is gone or the version moved on.
            let exists = sqlx::query("SELECT 1 FROM records WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
            match exists {
                Some(_) => Err(StoreError::Conflict {
                    key: key.to_string(),
                    expected: expected_version,
                }),
                None => Err(StoreError::NotFound(key.to_string())),
            }
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        bounded(self.call_timeout, "record ping", async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }
}
