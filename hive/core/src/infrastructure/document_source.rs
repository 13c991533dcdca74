// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Document Sources
//!
//! Reads ingestible documents off the local filesystem.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Filesystem walking and export parsing for bulk ingestion

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::ingest::{
    doc_id_for_path, parse_conversations, should_include, SecretRedactor, SourceDocument, SKIP_DIRS,
};

/// Export file holding every conversation as one list.
pub const SINGLE_EXPORT_FILE: &str = "conversations.json";

/// Documents of a documentation tree rooted at `root`, in path order.
///
/// Files that are not valid UTF-8 are skipped. Documents are redacted when
/// a redactor is given.
pub fn load_tree(root: &Path, redactor: Option<&SecretRedactor>) -> Result<Vec<SourceDocument>> {
    if !root.is_dir() {
        return Err(anyhow!("Directory not found: {:?}", root));
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry.depth() > 0
                && entry.file_name().to_str().is_some_and(|name| SKIP_DIRS.contains(&name)))
        });

    let mut documents = Vec::new();
    for entry in walker {
        let entry = entry.context("Failed to read directory entry")?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if !should_include(relative) {
            continue;
        }

        let body = match fs::read_to_string(entry.path()) {
            Ok(body) => body,
            Err(e) => {
                warn!(path = ?entry.path(), "Skipping unreadable file: {}", e);
                continue;
            }
        };
        if body.trim().is_empty() {
            debug!(path = ?relative, "Skipping empty file");
            continue;
        }

        let doc_id = doc_id_for_path(relative);
        documents.push(SourceDocument {
            body: redactor.map(|r| r.redact(&body)).unwrap_or(body),
            metadata: json!({"path": doc_id}),
            doc_id,
        });
    }
    Ok(documents)
}

/// Conversations of a chat export, redacted.
///
/// `path` is either a single export file or a directory holding
/// `conversations.json` and/or one JSON file per conversation. Files that
/// do not parse are skipped with a warning.
pub fn load_chat_export(path: &Path, redactor: &SecretRedactor) -> Result<Vec<SourceDocument>> {
    let files: Vec<(PathBuf, &str)> = if path.is_file() {
        vec![(path.to_path_buf(), "single")]
    } else if path.is_dir() {
        let mut files = Vec::new();
        let mut entries: Vec<PathBuf> = fs::read_dir(path)
            .with_context(|| format!("Failed to read export directory: {:?}", path))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();
        for file in entries {
            let kind = if file.file_name().is_some_and(|name| name == SINGLE_EXPORT_FILE) {
                "single"
            } else {
                "multi"
            };
            files.push((file, kind));
        }
        files
    } else {
        return Err(anyhow!("Export not found: {:?}", path));
    };

    let mut documents = Vec::new();
    for (file, kind) in files {
        let raw = fs::read_to_string(&file).with_context(|| format!("Failed to read {:?}", file))?;
        let conversations = match parse_conversations(&raw) {
            Ok(conversations) => conversations,
            Err(e) => {
                warn!(path = ?file, "Skipping export file that does not parse: {}", e);
                continue;
            }
        };
        let source_path = file.to_string_lossy();
        documents.extend(
            conversations
                .into_iter()
                .map(|conversation| conversation.into_document(redactor, &source_path, kind)),
        );
    }
    Ok(documents)
}
