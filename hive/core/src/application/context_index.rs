// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Context Index - Application Layer
//!
//! Learns text documents as overlapping chunks and answers relevance
//! queries over them. Ranked retrieval is tried first; when nothing
//! qualifies, a substring scan answers and the result says so through its
//! [`RetrievalMode`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::domain::chunking::ChunkingPolicy;
use crate::domain::context::{slugify, ContextChunk, ContextResult, RetrievalMode, UpsertStatus};
use crate::domain::repository::{ContextStore, StoreError};

/// Acknowledgement for `learn` and `upsert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextAck {
    pub status: UpsertStatus,
    pub doc_id: String,
    /// First chunk written.
    pub chunk_id: String,
    /// Chunks the document now consists of (1 for a single-chunk upsert).
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertRequest {
    pub source: String,
    pub doc_id: String,
    /// Upsert exactly this chunk; when absent the whole document is replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

#[async_trait]
pub trait ContextService: Send + Sync {
    /// Store `body` under the slug of `title`, replacing any earlier version.
    async fn learn(&self, title: &str, body: &str, tags: Vec<String>) -> Result<ContextAck, StoreError>;

    async fn upsert(&self, request: UpsertRequest) -> Result<ContextAck, StoreError>;

    /// At most `k` chunks relevant to `query`, best first.
    async fn fetch_context(&self, query: &str, k: usize) -> Result<ContextResult, StoreError>;
}

pub struct ContextIndex {
    store: Arc<dyn ContextStore>,
    policy: ChunkingPolicy,
    learn_source: String,
}

impl ContextIndex {
    pub fn new(store: Arc<dyn ContextStore>, policy: ChunkingPolicy, learn_source: impl Into<String>) -> Self {
        Self {
            store,
            policy,
            learn_source: learn_source.into(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    async fn replace(
        &self,
        source: &str,
        doc_id: &str,
        body: &str,
        metadata: Value,
    ) -> Result<ContextAck, StoreError> {
        if body.trim().is_empty() {
            return Err(StoreError::MalformedInput("document body must not be empty".to_string()));
        }
        let chunks: Vec<ContextChunk> = self
            .policy
            .split(body)
            .into_iter()
            .enumerate()
            .map(|(i, content)| ContextChunk::new(source, doc_id, i.to_string(), content, metadata.clone()))
            .collect();

        let status = self.store.replace_document(source, doc_id, &chunks).await?;
        info!(source, doc_id, chunks = chunks.len(), status = status.as_str(), "Stored document");
        Ok(ContextAck {
            status,
            doc_id: doc_id.to_string(),
            chunk_id: "0".to_string(),
            chunks: chunks.len(),
        })
    }
}

#[async_trait]
impl ContextService for ContextIndex {
    async fn learn(&self, title: &str, body: &str, tags: Vec<String>) -> Result<ContextAck, StoreError> {
        let doc_id = slugify(title);
        let metadata = json!({"title": title.trim(), "tags": tags});
        self.replace(&self.learn_source, &doc_id, body, metadata).await
    }

    async fn upsert(&self, request: UpsertRequest) -> Result<ContextAck, StoreError> {
        if request.source.trim().is_empty() || request.doc_id.trim().is_empty() {
            return Err(StoreError::MalformedInput("source and doc_id are required".to_string()));
        }
        let metadata = request.metadata.unwrap_or_else(|| json!({}));

        let Some(chunk_id) = request.chunk_id else {
            return self.replace(&request.source, &request.doc_id, &request.content, metadata).await;
        };

        if request.content.is_empty() {
            return Err(StoreError::MalformedInput("content must not be empty".to_string()));
        }
        let len = request.content.chars().count();
        if len > self.policy.size() {
            return Err(StoreError::MalformedInput(format!(
                "chunk content is {} characters, limit is {}",
                len,
                self.policy.size()
            )));
        }

        let chunk = ContextChunk::new(&request.source, &request.doc_id, &chunk_id, request.content, metadata);
        let status = self.store.upsert_chunk(&chunk).await?;
        Ok(ContextAck {
            status,
            doc_id: request.doc_id,
            chunk_id,
            chunks: 1,
        })
    }

    async fn fetch_context(&self, query: &str, k: usize) -> Result<ContextResult, StoreError> {
        let query = query.trim();
        if query.is_empty() || k == 0 {
            return Ok(ContextResult::empty());
        }

        let ranked = self.store.ranked_search(query, k).await?;
        if !ranked.is_empty() {
            return Ok(ContextResult {
                mode: RetrievalMode::Ranked,
                chunks: ranked,
            });
        }

        let chunks = self.store.substring_scan(query, k).await?;
        metrics::counter!("hive_context_fallback_total").increment(1);
        debug!(query, hits = chunks.len(), "No ranked candidates, used substring fallback");
        Ok(ContextResult {
            mode: RetrievalMode::Fallback,
            chunks,
        })
    }
}
