// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Bulk ingestion into the context index.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::context_index::{ContextService, UpsertRequest};
use crate::domain::ingest::SourceDocument;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    /// Doc ids that could not be stored.
    pub failed: Vec<String>,
}

/// Stores whole documents under one source; every document replaces its
/// earlier version, so re-running an ingest is idempotent.
pub struct DocumentIngestor {
    context: Arc<dyn ContextService>,
    source: String,
}

impl DocumentIngestor {
    pub fn new(context: Arc<dyn ContextService>, source: impl Into<String>) -> Self {
        Self {
            context,
            source: source.into(),
        }
    }

    pub async fn ingest(&self, documents: Vec<SourceDocument>) -> IngestReport {
        let mut report = IngestReport::default();
        for document in documents {
            let doc_id = document.doc_id.clone();
            let request = UpsertRequest {
                source: self.source.clone(),
                doc_id: document.doc_id,
                chunk_id: None,
                content: document.body,
                metadata: Some(document.metadata),
            };
            match self.context.upsert(request).await {
                Ok(ack) => {
                    report.documents += 1;
                    report.chunks += ack.chunks;
                }
                Err(e) => {
                    warn!(source = %self.source, doc_id = %doc_id, "Failed to ingest document: {}", e);
                    report.failed.push(doc_id);
                }
            }
        }
        metrics::counter!("hive_ingested_documents_total").increment(report.documents as u64);
        info!(
            source = %self.source,
            documents = report.documents,
            chunks = report.chunks,
            failed = report.failed.len(),
            "Ingest finished"
        );
        report
    }
}
