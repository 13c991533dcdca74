// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Context Store
//!
//! `ContextStore` backed by the `memory_chunks` table. Ranking is
//! `ts_rank_cd` over the English text-search configuration plus a title
//! boost; a document rewrite is one transaction so readers never see a mix
//! of old and new chunks.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use super::{bounded, sql_limit};
use crate::domain::context::{
    slugify, ContextChunk, ScoredChunk, UpsertStatus, EXACT_TITLE_BOOST, PARTIAL_TITLE_BOOST,
};
use crate::domain::repository::{ContextStore, StoreError};

pub struct PostgresContextStore {
    pool: PgPool,
    call_timeout: Duration,
}

impl PostgresContextStore {
    pub fn new(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }

    fn row_to_chunk(row: &PgRow) -> Result<ContextChunk, StoreError> {
        Ok(ContextChunk {
            source: row.try_get("source")?,
            doc_id: row.try_get("doc_id")?,
            chunk_id: row.try_get("chunk_id")?,
            content: row.try_get("content")?,
            metadata: row.try_get("metadata")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_scored(row: &PgRow) -> Result<ScoredChunk, StoreError> {
        Ok(ScoredChunk {
            chunk: Self::row_to_chunk(row)?,
            score: row.try_get("score")?,
        })
    }
}

/// `%needle%` with LIKE metacharacters escaped.
fn ilike_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

async fn upsert_one<'e, E>(executor: E, chunk: &ContextChunk) -> Result<UpsertStatus, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    let inserted: bool = sqlx::query(
        r#"
        INSERT INTO memory_chunks (source, doc_id, chunk_id, content, metadata, updated_at)
        VALUES ($1, $2, $3, $4, $5, now())
        ON CONFLICT (source, doc_id, chunk_id) DO UPDATE SET
            content = EXCLUDED.content,
            metadata = EXCLUDED.metadata,
            updated_at = now()
        RETURNING (xmax = 0) AS inserted
        "#,
    )
    .bind(&chunk.source)
    .bind(&chunk.doc_id)
    .bind(&chunk.chunk_id)
    .bind(&chunk.content)
    .bind(&chunk.metadata)
    .fetch_one(executor)
    .await?
    .try_get("inserted")?;

    Ok(if inserted {
        UpsertStatus::Inserted
    } else {
        UpsertStatus::Updated
    })
}

#[async_trait]
impl ContextStore for PostgresContextStore {
    async fn upsert_chunk(&self, chunk: &ContextChunk) -> Result<UpsertStatus, StoreError> {
        bounded(self.call_timeout, "chunk upsert", upsert_one(&self.pool, chunk)).await
    }

    async fn replace_document(
        &self,
        source: &str,
        doc_id: &str,
        chunks: &[ContextChunk],
    ) -> Result<UpsertStatus, StoreError> {
        bounded(self.call_timeout, "document replace", async {
            let mut tx = self.pool.begin().await?;

            let mut status = UpsertStatus::Inserted;
            for chunk in chunks {
                status = status.merge(upsert_one(&mut *tx, chunk).await?);
            }

            let keep: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();
            let removed = sqlx::query(
                r#"
                DELETE FROM memory_chunks
                WHERE source = $1 AND doc_id = $2 AND NOT (chunk_id = ANY($3))
                "#,
            )
            .bind(source)
            .bind(doc_id)
            .bind(&keep)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            tx.commit().await?;

            if removed > 0 {
                tracing::debug!(source, doc_id, removed, "Removed stale chunks");
                status = UpsertStatus::Updated;
            }
            Ok(status)
        })
        .await
    }

    async fn ranked_search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        let slug = slugify(query);
        bounded(self.call_timeout, "ranked search", async {
            let rows = sqlx::query(
                r#"
                WITH scored AS (
                    SELECT
                        source, doc_id, chunk_id, content, metadata, updated_at,
                        COALESCE(ts_rank_cd(to_tsvector('english', content),
                                            plainto_tsquery('english', $1)), 0)::float8 AS content_rank,
                        CASE
                            WHEN doc_id = $1 OR doc_id = $2 THEN $6::float8
                            WHEN doc_id ILIKE $3 OR doc_id ILIKE $4 THEN $7::float8
                            ELSE 0.0::float8
                        END AS title_boost
                    FROM memory_chunks
                    WHERE doc_id = $1
                       OR doc_id = $2
                       OR doc_id ILIKE $3
                       OR doc_id ILIKE $4
                       OR to_tsvector('english', content) @@ plainto_tsquery('english', $1)
                )
                SELECT source, doc_id, chunk_id, content, metadata, updated_at,
                       (content_rank + title_boost) AS score
                FROM scored
                ORDER BY score DESC, updated_at DESC
                LIMIT $5
                "#,
            )
            .bind(query)
            .bind(&slug)
            .bind(ilike_pattern(query))
            .bind(ilike_pattern(&slug))
            .bind(sql_limit(k))
            .bind(EXACT_TITLE_BOOST)
            .bind(PARTIAL_TITLE_BOOST)
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(Self::row_to_scored).collect()
        })
        .await
    }

    async fn substring_scan(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, StoreError> {
        bounded(self.call_timeout, "substring scan", async {
            let rows = sqlx::query(
                r#"
                SELECT source, doc_id, chunk_id, content, metadata, updated_at,
                       0.0::float8 AS score
                FROM memory_chunks
                WHERE content ILIKE $1
                ORDER BY updated_at DESC
                LIMIT $2
                "#,
            )
            .bind(ilike_pattern(query))
            .bind(sql_limit(k))
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(Self::row_to_scored).collect()
        })
        .await
    }

    async fn document_chunks(
        &self,
        source: &str,
        doc_id: &str,
    ) -> Result<Vec<ContextChunk>, StoreError> {
        bounded(self.call_timeout, "document chunks", async {
            let rows = sqlx::query(
                r#"
                SELECT source, doc_id, chunk_id, content, metadata, updated_at
                FROM memory_chunks
                WHERE source = $1 AND doc_id = $2
                ORDER BY length(chunk_id), chunk_id
                "#,
            )
            .bind(source)
            .bind(doc_id)
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(Self::row_to_chunk).collect()
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        bounded(self.call_timeout, "context ping", async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }
}
