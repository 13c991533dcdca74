// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # hive
//!
//! Shared coordination memory for agent swarms.
//!
//! - `hive serve` runs the HTTP API, the lease reaper and the metrics exporter
//! - `hive worker --role R` polls the queue for one role
//! - `hive task|memory|context ...` operate on the stores, either directly
//!   (configured backend) or through a running server (`--server`)
//! - `hive config show|validate|generate` and `hive update` manage setup

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use hive_cli::commands::{self, ConfigCommand, ContextCommand, MemoryCommand, ServeArgs, TaskCommand, WorkerArgs};
use hive_cli::init_logging;

/// hive - shared memory, task queue and context index for agent swarms
#[derive(Parser)]
#[command(name = "hive")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "HIVE_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL of a running hive server; commands go through it instead of
    /// opening the stores directly
    #[arg(long, global = true, env = "HIVE_SERVER", value_name = "URL")]
    server: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "HIVE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    #[command(name = "serve")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Run a polling worker for one role
    #[command(name = "worker")]
    Worker {
        #[command(flatten)]
        args: WorkerArgs,
    },

    /// Task queue operations
    #[command(name = "task")]
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Record store operations
    #[command(name = "memory")]
    Memory {
        #[command(subcommand)]
        command: MemoryCommand,
    },

    /// Context index operations
    #[command(name = "context")]
    Context {
        #[command(subcommand)]
        command: ContextCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Apply database migrations
    #[command(name = "update")]
    Update {
        #[command(flatten)]
        command: commands::UpdateCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let server = cli.server.as_deref();
    match cli.command {
        Some(Commands::Serve { args }) => commands::serve::execute(args, cli.config).await,
        Some(Commands::Worker { args }) => commands::worker::execute(args, cli.config, server).await,
        Some(Commands::Task { command }) => commands::task::handle_command(command, cli.config, server).await,
        Some(Commands::Memory { command }) => commands::memory::handle_command(command, cli.config, server).await,
        Some(Commands::Context { command }) => {
            commands::context::handle_command(command, cli.config, server).await
        }
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        Some(Commands::Update { command }) => commands::update::execute(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}
