// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task queue commands
//!
//! Commands: enqueue, pending, claim, complete, show, reap

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use hive_core::domain::task::{Task, TaskStatus};

use super::{parse_json_arg, pretty};
use crate::backend::Backend;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Queue a task for a role
    Enqueue {
        /// Task type, used to pick a handler
        #[arg(value_name = "TYPE")]
        task_type: String,

        /// Role that should execute it
        #[arg(long = "to", value_name = "ROLE")]
        assigned_to: String,

        /// Creator recorded on the task
        #[arg(long = "by", default_value = "cli")]
        created_by: String,

        /// Task payload (JSON or @file.json)
        #[arg(short, long, default_value = "{}")]
        payload: String,
    },

    /// List pending tasks for a role, newest first
    Pending {
        #[arg(value_name = "ROLE")]
        role: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Claim a pending task
    Claim {
        #[arg(value_name = "KEY")]
        key: String,

        /// Claimer identity
        #[arg(long, default_value = "cli")]
        worker: String,
    },

    /// Record a task's result
    Complete {
        #[arg(value_name = "KEY")]
        key: String,

        /// Result document (JSON or @file.json)
        #[arg(short, long, default_value = r#"{"status":"ok"}"#)]
        result: String,

        /// Only complete if this worker holds the claim
        #[arg(long)]
        worker: Option<String>,
    },

    /// Show a task
    Show {
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Requeue tasks whose claim lease has expired
    Reap {
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
    },
}

pub async fn handle_command(command: TaskCommand, config_path: Option<PathBuf>, server: Option<&str>) -> Result<()> {
    let backend = Backend::connect(config_path, server).await?;
    let queue = backend.task_queue();

    match command {
        TaskCommand::Enqueue {
            task_type,
            assigned_to,
            created_by,
            payload,
        } => {
            let payload = parse_json_arg(&payload)?;
            let key = queue
                .enqueue(&task_type, payload, &assigned_to, &created_by)
                .await
                .context("Failed to enqueue task")?;
            println!("{} {}", "✓ Task queued:".green(), key);
        }
        TaskCommand::Pending { role, limit } => {
            let pending = queue.find_pending(&role, limit).await?;
            if pending.is_empty() {
                println!("{}", format!("No pending tasks for {}", role).dimmed());
            }
            for queued in pending {
                println!(
                    "{}  {}  from {}",
                    queued.key.bold(),
                    queued.task.task_type,
                    queued.task.created_by
                );
            }
        }
        TaskCommand::Claim { key, worker } => match queue.claim(&key, &worker).await? {
            Some(task) => {
                println!("{} {}", "✓ Claimed:".green(), key);
                print_task(&key, &task);
            }
            None => println!("{}", format!("{} is not claimable", key).yellow()),
        },
        TaskCommand::Complete { key, result, worker } => {
            let result = parse_json_arg(&result)?;
            let completed = match worker {
                Some(worker) => queue.complete_as(&key, &worker, result).await?,
                None => queue.complete(&key, result).await?,
            };
            match completed {
                Some(_) => println!("{} {}", "✓ Completed:".green(), key),
                None => println!("{}", format!("{} was not completed (missing, done or not yours)", key).yellow()),
            }
        }
        TaskCommand::Show { key } => match queue.get(&key).await? {
            Some(queued) => print_task(&queued.key, &queued.task),
            None => println!("{}", format!("No task under {}", key).yellow()),
        },
        TaskCommand::Reap { limit } => {
            let report = queue.reclaim_expired(limit).await?;
            println!(
                "{} requeued {}, exhausted {}",
                "✓ Sweep finished:".green(),
                report.requeued.len(),
                report.exhausted.len()
            );
            for key in report.requeued.iter().chain(report.exhausted.iter()) {
                println!("  {}", key);
            }
        }
    }
    Ok(())
}

fn print_task(key: &str, task: &Task) {
    let status = match task.status {
        TaskStatus::Pending => task.status.as_str().yellow(),
        TaskStatus::Claimed => task.status.as_str().cyan(),
        TaskStatus::Done => task.status.as_str().green(),
    };
    println!("{}", key.bold());
    println!("  Type: {}", task.task_type);
    println!("  Status: {}", status);
    println!("  Assigned to: {}", task.assigned_to);
    println!("  Created by: {}", task.created_by);
    if let Some(claimer) = &task.claimed_by {
        println!("  Claimed by: {} (attempt {})", claimer, task.attempts);
    }
    println!("  Payload: {}", pretty(&task.payload));
    if let Some(result) = &task.result {
        println!("  Result: {}", pretty(result));
    }
}
