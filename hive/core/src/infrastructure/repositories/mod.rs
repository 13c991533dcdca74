// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Store Implementations
//!
//! Infrastructure implementations of the store contracts defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve records and context chunks
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL
//! - **PostgresRecordStore** - `records` table, recency by sequence, CAS by version
//! - **PostgresContextStore** - `memory_chunks` table, `ts_rank_cd` + title boost
//!
//! ## In-Memory
//! - **InMemoryRecordStore** - one lock scope per write; used by tests and the `memory` backend
//! - **InMemoryContextStore** - lexical scorer standing in for PostgreSQL full-text rank

pub mod postgres_context;
pub mod postgres_record;

pub use postgres_context::PostgresContextStore;
pub use postgres_record::PostgresRecordStore;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;

use crate::domain::context::{title_boost, ContextChunk, ScoredChunk, UpsertStatus};
use crate::domain::record::{generate_key, payload_matches, Record};
use crate::domain::repository::{ContextStore, RecordStore, StoreError};

/// Bound a store call by `limit`; expiry is reported as a connectivity failure.
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Connectivity(format!(
            "{} timed out after {:?}",
            operation, limit
        ))),
    }
}

/// `LIMIT` parameter for a caller-supplied count; saturates instead of wrapping.
pub(crate) fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Chunk ids are decimal indices; order "2" before "10".
pub(crate) fn chunk_id_order(a: &str, b: &str) -> std::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

// ============================================================================
// Records
// ============================================================================

#[derive(Default)]
struct RecordState {
    records: HashMap<String, (Record, u64)>,
    recency: BTreeMap<u64, String>,
    next_seq: u64,
}

impl RecordState {
    /// Store `record` and move its key to the head of the recency index.
    fn put(&mut self, record: Record) {
        self.next_seq += 1;
        let seq = self.next_seq;
        if let Some((_, old_seq)) = self.records.get(&record.key) {
            self.recency.remove(old_seq);
        }
        self.recency.insert(seq, record.key.clone());
        self.records.insert(record.key.clone(), (record, seq));
    }
}

#[derive(Clone)]
pub struct InMemoryRecordStore {
    namespace: String,
    state: Arc<RwLock<RecordState>>,
}

impl InMemoryRecordStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: Arc::new(RwLock::new(RecordState::default())),
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
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

        let mut state = self.state.write();
        let version = state
            .records
            .get(&key)
            .map(|(existing, _)| existing.version + 1)
            .unwrap_or(1);
        state.put(Record {
            key: key.clone(),
            payload: data,
            ts: Utc::now(),
            version,
        });
        Ok(key)
    }

    async fn read(&self, key: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.state.read().records.get(key).map(|(record, _)| record.clone()))
    }

    async fn search_window(
        &self,
        query: &str,
        window: usize,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let needle = query.to_lowercase();
        let state = self.state.read();
        let results = state
            .recency
            .values()
            .rev()
            .take(window)
            .filter_map(|key| state.records.get(key))
            .filter(|(record, _)| payload_matches(&record.payload, &needle))
            .take(limit)
            .map(|(record, _)| record.clone())
            .collect();
        Ok(results)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: i64,
        data: Value,
    ) -> Result<Record, StoreError> {
        let mut state = self.state.write();
        let current = match state.records.get(key) {
            Some((record, _)) => record.version,
            None => return Err(StoreError::NotFound(key.to_string())),
        };
        if current != expected_version {
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected: expected_version,
            });
        }
        let record = Record {
            key: key.to_string(),
            payload: data,
            ts: Utc::now(),
            version: current + 1,
        };
        state.put(record.clone());
        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// Context chunks
// ============================================================================

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it",
    "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "will", "with",
];

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .collect()
}

/// Term-frequency density of the query terms in `content`; `None` unless
/// every query term occurs. Always below 1.0, so it never outweighs a title boost.
fn lexical_rank(terms: &HashSet<String>, content: &str) -> Option<f64> {
    if terms.is_empty() {
        return None;
    }
    let tokens = tokenize(content);
    let mut hits = 0usize;
    for term in terms {
        let count = tokens.iter().filter(|token| *token == term).count();
        if count == 0 {
            return None;
        }
        hits += count;
    }
    Some(hits as f64 / (tokens.len() as f64 + 1.0))
}

type ChunkKey = (String, String, String);

#[derive(Clone, Default)]
pub struct InMemoryContextStore {
    chunks: Arc<RwLock<BTreeMap<ChunkKey, ContextChunk>>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(chunk: &ContextChunk) -> ChunkKey {
        (chunk.source.clone(), chunk.doc_id.clone(), chunk.chunk_id.clone())
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn upsert_chunk(&self, chunk: &ContextChunk) -> Result<UpsertStatus, StoreError> {
        let mut stored = chunk.clone();
        stored.updated_at = Utc::now();
        let previous = self.chunks.write().insert(Self::key(chunk), stored);
        Ok(match previous {
            Some(_) => UpsertStatus::Updated,
            None => UpsertStatus::Inserted,
        })
    }

    async fn replace_document(
        &self,
        source: &str,
        doc_id: &str,
        chunks: &[ContextChunk],
    ) -> Result<UpsertStatus, StoreError> {
        let mut map = self.chunks.write();
        let mut status = UpsertStatus::Inserted;
        let now = Utc::now();
        let keep: HashSet<&str> = chunks.iter().map(|c| c.chunk_id.as_str()).collect();

        for chunk in chunks {
            let mut stored = chunk.clone();
            stored.updated_at = now;
            if map.insert(Self::key(chunk), stored).is_some() {
                status = UpsertStatus::Updated;
            }
        }
        map.retain(|(s, d, c), _| !(s == source && d == doc_id && !keep.contains(c.as_str())));
        Ok(status)
    }

    async fn ranked_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let terms: HashSet<String> = tokenize(query).into_iter().collect();
        let map = self.chunks.read();

        let mut scored: Vec<ScoredChunk> = map
            .values()
            .filter_map(|chunk| {
                let boost = title_boost(&chunk.doc_id, query);
                let rank = lexical_rank(&terms, &chunk.content);
                if boost == 0.0 && rank.is_none() {
                    return None;
                }
                Some(ScoredChunk {
                    chunk: chunk.clone(),
                    score: rank.unwrap_or(0.0) + boost,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.chunk.updated_at.cmp(&a.chunk.updated_at))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn substring_scan(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let needle = query.to_lowercase();
        let map = self.chunks.read();
        let mut hits: Vec<&ContextChunk> = map
            .values()
            .filter(|chunk| chunk.content.to_lowercase().contains(&needle))
            .collect();
        hits.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(hits
            .into_iter()
            .take(k)
            .map(|chunk| ScoredChunk {
                chunk: chunk.clone(),
                score: 0.0,
            })
            .collect())
    }

    async fn document_chunks(
        &self,
        source: &str,
        doc_id: &str,
    ) -> Result<Vec<ContextChunk>, StoreError> {
        let mut chunks: Vec<ContextChunk> = self
            .chunks
            .read()
            .values()
            .filter(|chunk| chunk.source == source && chunk.doc_id == doc_id)
            .cloned()
            .collect();
        chunks.sort_by(|a, b| chunk_id_order(&a.chunk_id, &b.chunk_id));
        Ok(chunks)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sql_limit_saturates() {
        assert_eq!(sql_limit(25), 25);
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_write_read_last_write_wins() {
        let store = InMemoryRecordStore::new("test");
        let key = store.write(json!({"n": 1}), None).await.unwrap();
        assert!(key.starts_with("test:"));

        store.write(json!({"n": 2}), Some(key.clone())).await.unwrap();
        let record = store.read(&key).await.unwrap().unwrap();
        assert_eq!(record.payload, json!({"n": 2}));
        assert_eq!(record.version, 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let store = InMemoryRecordStore::new("test");
        assert!(store.read("test:nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_is_newest_first_and_bounded() {
        let store = InMemoryRecordStore::new("test");
        for i in 0..10 {
            store.write(json!({"kind": "note", "i": i}), None).await.unwrap();
        }
        let results = store.search("note", 3).await.unwrap();
        let order: Vec<i64> = results.iter().map(|r| r.payload["i"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn test_search_only_scans_recent_window() {
        let store = InMemoryRecordStore::new("test");
        store.write(json!({"needle": true}), None).await.unwrap();
        for i in 0..5 {
            store.write(json!({"filler": i}), None).await.unwrap();
        }
        assert!(store.search("needle", 5).await.unwrap().is_empty());
        assert_eq!(store.search_window("needle", 6, 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rewrite_moves_key_to_head() {
        let store = InMemoryRecordStore::new("test");
        let first = store.write(json!({"tag": "x", "n": 1}), None).await.unwrap();
        store.write(json!({"tag": "x", "n": 2}), None).await.unwrap();
        store.write(json!({"tag": "x", "n": 3}), Some(first.clone())).await.unwrap();

        let results = store.search("x", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].key, first);
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = InMemoryRecordStore::new("test");
        let key = store.write(json!({"v": "a"}), None).await.unwrap();

        let swapped = store.compare_and_swap(&key, 1, json!({"v": "b"})).await.unwrap();
        assert_eq!(swapped.version, 2);

        let err = store.compare_and_swap(&key, 1, json!({"v": "c"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 1, .. }));

        let err = store.compare_and_swap("test:missing", 1, json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ranked_search_prefers_exact_title() {
        let store = InMemoryContextStore::new();
        store
            .upsert_chunk(&ContextChunk::new("h", "launch-plan", "0", "Ship the beta in March.", json!({})))
            .await
            .unwrap();
        store
            .upsert_chunk(&ContextChunk::new("h", "retro", "0", "Notes about the launch plan slipping.", json!({})))
            .await
            .unwrap();

        let results = store.ranked_search("launch plan", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.doc_id, "launch-plan");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_stop_words_alone_never_match_content() {
        let store = InMemoryContextStore::new();
        store
            .upsert_chunk(&ContextChunk::new("h", "doc", "0", "the and of", json!({})))
            .await
            .unwrap();
        assert!(store.ranked_search("the", 5).await.unwrap().is_empty());
        assert_eq!(store.substring_scan("the", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_document_drops_stale_chunks() {
        let store = InMemoryContextStore::new();
        let three: Vec<ContextChunk> = (0..3)
            .map(|i| ContextChunk::new("h", "doc", i.to_string(), format!("part {}", i), json!({})))
            .collect();
        assert_eq!(store.replace_document("h", "doc", &three).await.unwrap(), UpsertStatus::Inserted);

        let one = vec![ContextChunk::new("h", "doc", "0", "rewritten", json!({}))];
        assert_eq!(store.replace_document("h", "doc", &one).await.unwrap(), UpsertStatus::Updated);

        let chunks = store.document_chunks("h", "doc").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "rewritten");
    }

    #[test]
    fn test_chunk_id_order_is_numeric() {
        let mut ids = vec!["10", "2", "1", "0"];
        ids.sort_by(|a, b| chunk_id_order(a, b));
        assert_eq!(ids, vec!["0", "1", "2", "10"]);
    }

    #[tokio::test]
    async fn test_bounded_times_out_as_connectivity() {
        let err = bounded(Duration::from_millis(10), "slow call", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await
        .unwrap_err();
        assert!(err.is_transient());
    }
}
