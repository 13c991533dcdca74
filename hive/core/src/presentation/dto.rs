// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Wire types for the HTTP surface, shared with `hive-sdk`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::context::{RetrievalMode, ScoredChunk};
use crate::domain::record::Record;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_CONTEXT_LIMIT: i64 = 5;
pub const MAX_CONTEXT_LIMIT: i64 = 50;
pub const DEFAULT_FETCH_K: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResponse {
    pub ok: bool,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRequest {
    pub key: String,
}

/// `{ok, data, ts, version}` on a hit, `{ok: false, error: "not_found"}` on a miss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadResponse {
    pub fn found(record: &Record) -> Self {
        Self {
            ok: true,
            data: Some(record.payload.clone()),
            ts: Some(record.ts_seconds()),
            version: Some(record.version),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            ok: false,
            data: None,
            ts: None,
            version: None,
            error: Some("not_found".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    /// Recency entries to scan; defaults to `limit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<usize>,
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub key: String,
    pub data: Value,
    pub ts: f64,
    #[serde(default)]
    pub version: i64,
}

impl From<Record> for SearchHit {
    fn from(record: Record) -> Self {
        Self {
            ts: record.ts_seconds(),
            key: record.key,
            data: record.payload,
            version: record.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub ok: bool,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasRequest {
    pub key: String,
    pub version: i64,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasResponse {
    pub ok: bool,
    pub key: String,
    pub version: i64,
    pub ts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSearchQuery {
    pub query: String,
    #[serde(default = "default_context_limit")]
    pub limit: i64,
}

fn default_context_limit() -> i64 {
    DEFAULT_CONTEXT_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextHit {
    pub doc_id: String,
    pub chunk_id: String,
    pub snippet: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSearchResponse {
    pub query: String,
    pub count: usize,
    pub mode: RetrievalMode,
    pub results: Vec<ContextHit>,
}

impl ContextSearchResponse {
    pub fn new(query: String, mode: RetrievalMode, chunks: &[ScoredChunk], snippet_chars: usize) -> Self {
        let results: Vec<ContextHit> = chunks
            .iter()
            .map(|scored| ContextHit {
                doc_id: scored.chunk.doc_id.clone(),
                chunk_id: scored.chunk.chunk_id.clone(),
                snippet: scored.chunk.snippet(snippet_chars),
                score: scored.score,
            })
            .collect();
        Self {
            query,
            count: results.len(),
            mode,
            results,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextFetchRequest {
    pub query: String,
    #[serde(default = "default_fetch_k")]
    pub k: usize,
}

fn default_fetch_k() -> usize {
    DEFAULT_FETCH_K
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
