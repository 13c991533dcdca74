// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Record store commands
//!
//! Commands: write, read, search

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;

use hive_core::presentation::dto::DEFAULT_SEARCH_LIMIT;

use super::{parse_json_arg, pretty};
use crate::backend::Backend;

#[derive(Subcommand)]
pub enum MemoryCommand {
    /// Store a JSON object
    Write {
        /// JSON object (or @file.json)
        #[arg(value_name = "DATA")]
        data: String,

        /// Key to write under (default: generated)
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Show the record stored under a key
    Read {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Substring search over recent records, newest first
    Search {
        #[arg(value_name = "QUERY")]
        query: String,

        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
    },
}

pub async fn handle_command(command: MemoryCommand, config_path: Option<PathBuf>, server: Option<&str>) -> Result<()> {
    let backend = Backend::connect(config_path, server).await?;
    let records = &backend.records;

    match command {
        MemoryCommand::Write { data, key } => {
            let data = parse_json_arg(&data)?;
            if !data.is_object() {
                bail!("DATA must be a JSON object");
            }
            let key = records.write(data, key).await?;
            println!("{} {}", "✓ Written:".green(), key);
        }
        MemoryCommand::Read { key } => match records.read(&key).await? {
            Some(record) => {
                println!("{} (version {}, {})", record.key.bold(), record.version, record.ts.to_rfc3339());
                println!("{}", pretty(&record.payload));
            }
            None => println!("{}", format!("No record under {}", key).yellow()),
        },
        MemoryCommand::Search { query, limit } => {
            let results = records.search(&query, limit).await?;
            if results.is_empty() {
                println!("{}", "No matching records".dimmed());
            }
            for record in results {
                println!("{} {}", record.key.bold(), record.payload);
            }
        }
    }
    Ok(())
}
