// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Store traits backed by a remote hive server.
//!
//! Claims stay atomic across processes because `compare_and_swap` maps onto
//! the server's conditional write; the version check happens server-side.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use hive_core::application::context_index::{ContextAck, ContextService, UpsertRequest};
use hive_core::domain::context::ContextResult;
use hive_core::domain::record::{from_unix_seconds, Record};
use hive_core::domain::repository::{RecordStore, StoreError};

use crate::client::HiveClient;

pub struct HttpRecordStore {
    client: Arc<HiveClient>,
    namespace: String,
}

impl HttpRecordStore {
    /// `namespace` must match the server's; task keys are derived from it.
    pub fn new(client: Arc<HiveClient>, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn write(&self, data: Value, key: Option<String>) -> Result<String, StoreError> {
        Ok(self.client.write(data, key).await?)
    }

    async fn read(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let Some(response) = self.client.read(key).await? else {
            return Ok(None);
        };
        let payload = response
            .data
            .ok_or_else(|| StoreError::Serialization(format!("read of '{}' returned no data", key)))?;
        Ok(Some(Record {
            key: key.to_string(),
            payload,
            ts: from_unix_seconds(response.ts.unwrap_or_default()),
            version: response.version.unwrap_or(1),
        }))
    }

    async fn search_window(&self, query: &str, window: usize, limit: usize) -> Result<Vec<Record>, StoreError> {
        let hits = self.client.search(query, limit, Some(window)).await?;
        Ok(hits
            .into_iter()
            .map(|hit| Record {
                key: hit.key,
                payload: hit.data,
                ts: from_unix_seconds(hit.ts),
                version: hit.version,
            })
            .collect())
    }

    async fn compare_and_swap(&self, key: &str, expected_version: i64, data: Value) -> Result<Record, StoreError> {
        match self.client.compare_and_swap(key, expected_version, data.clone()).await {
            Ok(response) => Ok(Record {
                key: response.key,
                payload: data,
                ts: from_unix_seconds(response.ts),
                version: response.version,
            }),
            Err(e) if e.status() == Some(StatusCode::CONFLICT) => Err(StoreError::Conflict {
                key: key.to_string(),
                expected: expected_version,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.client.health().await?)
    }
}

pub struct HttpContextService {
    client: Arc<HiveClient>,
}

impl HttpContextService {
    pub fn new(client: Arc<HiveClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContextService for HttpContextService {
    async fn learn(&self, title: &str, body: &str, tags: Vec<String>) -> Result<ContextAck, StoreError> {
        Ok(self.client.learn(title, body, tags).await?)
    }

    async fn upsert(&self, request: UpsertRequest) -> Result<ContextAck, StoreError> {
        Ok(self.client.upsert(&request).await?)
    }

    async fn fetch_context(&self, query: &str, k: usize) -> Result<ContextResult, StoreError> {
        Ok(self.client.fetch_context(query, k).await?)
    }
}
