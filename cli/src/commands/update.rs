// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Database Update Command
//!
//! `hive update` applies the embedded migrations to the configured
//! PostgreSQL database. `--dry-run` lists pending migrations without
//! applying them.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use hive_core::domain::config::{BackendKind, HiveConfig};
use hive_core::domain::repository::StorageBackend;
use hive_core::infrastructure::db::{Database, MIGRATOR};

#[derive(Args)]
pub struct UpdateCommand {
    /// Perform a dry run without applying changes
    #[arg(long)]
    dry_run: bool,
}

pub async fn execute(cmd: UpdateCommand, config_path: Option<PathBuf>) -> Result<()> {
    println!("{}", "hive update".bold().green());

    let mut config = HiveConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.storage.backend = BackendKind::Postgres;
    let StorageBackend::PostgreSQL(pg) = config
        .storage_backend()
        .context("No database configured. Set storage.database_url or HIVE_DATABASE_URL.")?
    else {
        anyhow::bail!("No database configured");
    };

    println!("Connecting to database...");
    let db = Database::new(&pg.connection_string, 1, config.call_timeout)
        .await
        .context("Failed to connect to database")?;

    let applied_count = sqlx::query("SELECT version FROM _sqlx_migrations")
        .fetch_all(db.get_pool())
        .await
        .map(|rows| rows.len())
        .unwrap_or(0);
    let total_migrations = MIGRATOR.iter().count();

    println!(
        "Migration status: {} applied, {} total available.",
        applied_count, total_migrations
    );

    if applied_count >= total_migrations {
        println!("{}", "✓ Database is up to date.".green());
        return Ok(());
    }

    if cmd.dry_run {
        println!("Pending migrations found (Dry Run):");
        for migration in MIGRATOR.iter().skip(applied_count) {
            println!(" - {} {}", migration.version, migration.description);
        }
        println!("Skipping application due to --dry-run");
        return Ok(());
    }

    println!("Applying pending migrations...");
    db.migrate().await.context("Failed to apply migrations")?;
    println!("{}", "✓ Database updated successfully.".green());

    Ok(())
}
