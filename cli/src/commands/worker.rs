// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `hive worker` - poll the queue for one role until interrupted

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::info;

use hive_swarm::application::{builtin_handler, PollingWorker, WorkerSettings, BUILTIN_HANDLERS};
use hive_swarm::HandlerRegistry;

use super::shutdown_signal;
use crate::backend::Backend;

#[derive(Args)]
pub struct WorkerArgs {
    /// Role whose tasks this worker executes (matches `assigned_to`)
    #[arg(long)]
    role: String,

    /// Worker identity recorded on claims (default: <role>-<random>)
    #[arg(long)]
    worker_id: Option<String>,

    /// Handlers to enable (default: all built-in handlers)
    #[arg(long, value_delimiter = ',')]
    handlers: Vec<String>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,
}

pub async fn execute(args: WorkerArgs, config_path: Option<PathBuf>, server: Option<&str>) -> Result<()> {
    let backend = Backend::connect(config_path, server).await?;

    let names: Vec<String> = if args.handlers.is_empty() {
        BUILTIN_HANDLERS.iter().map(|name| name.to_string()).collect()
    } else {
        args.handlers
    };
    let mut registry = HandlerRegistry::new();
    for name in &names {
        match builtin_handler(name, backend.context.clone()) {
            Some(handler) => {
                registry.register(handler);
            }
            None => bail!(
                "Unknown handler '{}'. Available: {}",
                name,
                BUILTIN_HANDLERS.join(", ")
            ),
        }
    }

    let worker_id = args
        .worker_id
        .unwrap_or_else(|| format!("{}-{}", args.role, &uuid::Uuid::new_v4().simple().to_string()[..8]));
    let settings = WorkerSettings::from_config(args.role.clone(), worker_id.clone(), &backend.config);
    let worker = Arc::new(PollingWorker::new(
        settings,
        backend.task_queue(),
        backend.audit_trail(),
        registry,
    ));

    if args.once {
        let report = worker.poll_once().await.context("Poll cycle failed")?;
        println!(
            "claimed {} · completed {} · skipped {} · failed {}",
            report.claimed, report.completed, report.skipped, report.failed
        );
        return Ok(());
    }

    println!(
        "{} {} as {} ({})",
        "Worker polling for role".green(),
        args.role.bold(),
        worker_id.bold(),
        names.join(", ")
    );

    let token = worker.shutdown_token();
    let handle = worker.start();
    shutdown_signal().await;
    token.cancel();
    handle.await.context("Worker task panicked")?;
    info!(worker = %worker_id, "Worker stopped");

    Ok(())
}
