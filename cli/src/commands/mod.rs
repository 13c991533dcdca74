// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the hive CLI

pub mod config;
pub mod context;
pub mod memory;
pub mod serve;
pub mod task;
pub mod update;
pub mod worker;

pub use self::config::ConfigCommand;
pub use self::context::ContextCommand;
pub use self::memory::MemoryCommand;
pub use self::serve::ServeArgs;
pub use self::task::TaskCommand;
pub use self::update::UpdateCommand;
pub use self::worker::WorkerArgs;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::signal;
use tracing::info;

/// Parse a JSON argument; `@path` reads the document from a file.
pub fn parse_json_arg(input: &str) -> Result<Value> {
    let raw = match input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?,
        None => input.to_string(),
    };
    serde_json::from_str(&raw).context("Argument is not valid JSON")
}

/// Pretty JSON for terminal output.
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
