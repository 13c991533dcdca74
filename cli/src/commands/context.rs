// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Context index commands
//!
//! Commands: learn, search, upsert, ingest, ingest-export

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use hive_core::application::context_index::{ContextAck, UpsertRequest};
use hive_core::application::ingest::{DocumentIngestor, IngestReport};
use hive_core::domain::ingest::{SecretRedactor, DEFAULT_EXPORT_SOURCE, DEFAULT_TREE_SOURCE};
use hive_core::infrastructure::document_source::{load_chat_export, load_tree};
use hive_core::presentation::dto::DEFAULT_CONTEXT_LIMIT;

use super::parse_json_arg;
use crate::backend::Backend;

#[derive(Subcommand)]
pub enum ContextCommand {
    /// Store a document under the slug of its title, replacing older versions
    Learn {
        #[arg(value_name = "TITLE")]
        title: String,

        /// Document body; `@path` reads it from a file
        #[arg(value_name = "BODY")]
        body: String,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Find the chunks most relevant to a query
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        #[arg(short, long, default_value_t = DEFAULT_CONTEXT_LIMIT as usize)]
        limit: usize,
    },

    /// Write one chunk directly
    Upsert {
        #[arg(long)]
        source: String,

        #[arg(long)]
        doc_id: String,

        /// Defaults to the doc id
        #[arg(long)]
        chunk_id: Option<String>,

        /// Chunk content; `@path` reads it from a file
        #[arg(value_name = "CONTENT")]
        content: String,

        /// Metadata object (JSON or @file.json)
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Ingest a documentation tree: top-level markdown plus docs/ and brain/
    Ingest {
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        #[arg(long, default_value = DEFAULT_TREE_SOURCE)]
        source: String,

        /// Strip credential-like strings before storing
        #[arg(long)]
        redact: bool,
    },

    /// Ingest a chat export (conversations.json or a directory of JSON files)
    IngestExport {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        #[arg(long, default_value = DEFAULT_EXPORT_SOURCE)]
        source: String,
    },
}

pub async fn handle_command(command: ContextCommand, config_path: Option<PathBuf>, server: Option<&str>) -> Result<()> {
    let backend = Backend::connect(config_path, server).await?;
    let context = &backend.context;

    match command {
        ContextCommand::Learn { title, body, tags } => {
            let body = read_text_arg(&body)?;
            let ack = context.learn(&title, &body, tags).await?;
            print_ack(&ack);
        }
        ContextCommand::Search { query, limit } => {
            let result = context.fetch_context(&query, limit).await?;
            if result.is_fallback() {
                println!("{}", "(no ranked matches; showing substring matches by recency)".dimmed());
            }
            if result.chunks.is_empty() {
                println!("{}", "No matching context".dimmed());
            }
            let snippet_chars = backend.config.context.snippet_chars;
            for scored in result.chunks {
                println!(
                    "{} {} {}",
                    format!("{:.3}", scored.score).cyan(),
                    scored.chunk.doc_id.bold(),
                    scored.chunk.chunk_id.dimmed()
                );
                println!("  {}", scored.chunk.snippet(snippet_chars));
            }
        }
        ContextCommand::Upsert {
            source,
            doc_id,
            chunk_id,
            content,
            metadata,
        } => {
            let request = UpsertRequest {
                source,
                doc_id,
                chunk_id,
                content: read_text_arg(&content)?,
                metadata: metadata.as_deref().map(parse_json_arg).transpose()?,
            };
            let ack = context.upsert(request).await?;
            print_ack(&ack);
        }
        ContextCommand::Ingest { dir, source, redact } => {
            let redactor = redact.then(SecretRedactor::new).transpose()?;
            let documents = load_tree(&dir, redactor.as_ref())?;
            let report = DocumentIngestor::new(Arc::clone(context), source).ingest(documents).await;
            print_report(&report)?;
        }
        ContextCommand::IngestExport { path, source } => {
            let documents = load_chat_export(&path, &SecretRedactor::new()?)?;
            let report = DocumentIngestor::new(Arc::clone(context), source).ingest(documents).await;
            print_report(&report)?;
        }
    }
    Ok(())
}

fn print_report(report: &IngestReport) -> Result<()> {
    println!(
        "{} {} document{}, {} chunk{}",
        "✓ Ingested:".green(),
        report.documents,
        if report.documents == 1 { "" } else { "s" },
        report.chunks,
        if report.chunks == 1 { "" } else { "s" }
    );
    if report.failed.is_empty() {
        return Ok(());
    }
    for doc_id in &report.failed {
        eprintln!("  {} {}", "✗".red(), doc_id);
    }
    anyhow::bail!("{} document(s) could not be stored", report.failed.len())
}

fn read_text_arg(input: &str) -> Result<String> {
    match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path)),
        None => Ok(input.to_string()),
    }
}

fn print_ack(ack: &ContextAck) {
    println!(
        "{} {} ({} chunk{}, {})",
        "✓ Stored:".green(),
        ack.doc_id.bold(),
        ack.chunks,
        if ack.chunks == 1 { "" } else { "s" },
        ack.status.as_str()
    );
}
