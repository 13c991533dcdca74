// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Context Chunks
//!
//! Text knowledge is stored as chunks keyed by `(source, doc_id, chunk_id)`.
//! Retrieval scores a chunk as *content relevance + title boost*:
//!
//! | Relation of `doc_id` to the query | Boost |
//! |-----------------------------------|-------|
//! | equal to the query or its slug    | [`EXACT_TITLE_BOOST`] |
//! | contains the query or its slug    | [`PARTIAL_TITLE_BOOST`] |
//! | none                              | 0 |
//!
//! When nothing qualifies for ranking, a substring scan answers instead and
//! the result carries [`RetrievalMode::Fallback`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EXACT_TITLE_BOOST: f64 = 10.0;
pub const PARTIAL_TITLE_BOOST: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub source: String,
    pub doc_id: String,
    pub chunk_id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Value,
    pub updated_at: DateTime<Utc>,
}

impl ContextChunk {
    pub fn new(
        source: impl Into<String>,
        doc_id: impl Into<String>,
        chunk_id: impl Into<String>,
        content: impl Into<String>,
        metadata: Value,
    ) -> Self {
        Self {
            source: source.into(),
            doc_id: doc_id.into(),
            chunk_id: chunk_id.into(),
            content: content.into(),
            metadata,
            updated_at: Utc::now(),
        }
    }

    /// First `max_chars` characters of the content.
    pub fn snippet(&self, max_chars: usize) -> String {
        self.content.chars().take(max_chars).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: ContextChunk,
    pub score: f64,
}

/// Which retrieval regime produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Full-text rank plus title boost.
    Ranked,
    /// Substring scan by recency; every score is zero.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextResult {
    pub mode: RetrievalMode,
    pub chunks: Vec<ScoredChunk>,
}

impl ContextResult {
    pub fn empty() -> Self {
        Self {
            mode: RetrievalMode::Ranked,
            chunks: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.mode == RetrievalMode::Fallback
    }
}

/// Whether an upsert created rows or overwrote existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertStatus {
    #[serde(rename = "ok")]
    Inserted,
    #[serde(rename = "updated")]
    Updated,
}

impl UpsertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertStatus::Inserted => "ok",
            UpsertStatus::Updated => "updated",
        }
    }

    pub fn merge(self, other: UpsertStatus) -> UpsertStatus {
        if self == UpsertStatus::Updated || other == UpsertStatus::Updated {
            UpsertStatus::Updated
        } else {
            UpsertStatus::Inserted
        }
    }
}

/// Stable document identifier derived from a title: lowercase ASCII
/// alphanumerics, every other run collapsed to a single `-`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Title boost for `doc_id` against `query`. Exact wins over partial.
pub fn title_boost(doc_id: &str, query: &str) -> f64 {
    let query = query.trim();
    if query.is_empty() {
        return 0.0;
    }
    let slug = slugify(query);
    if doc_id == query || doc_id == slug {
        return EXACT_TITLE_BOOST;
    }
    let doc_lower = doc_id.to_lowercase();
    if doc_lower.contains(&query.to_lowercase()) || doc_lower.contains(&slug) {
        return PARTIAL_TITLE_BOOST;
    }
    0.0
}
