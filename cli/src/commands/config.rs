// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use hive_core::domain::config::{BackendKind, HiveConfig, CONFIG_PATH_ENV};

/// Annotated starting point written by `hive config generate`.
pub const CONFIG_TEMPLATE: &str = include_str!("../../templates/hive-config.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./hive-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, force } => generate(&output, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = HiveConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        for (i, path) in HiveConfig::search_paths().iter().enumerate() {
            let marker = if path.exists() { "✓".green() } else { "·".dimmed() };
            println!("  {}. {} {}", i + 2, path.display(), marker);
        }
        println!(
            "  ({}: {})",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "not set".to_string()).dimmed()
        );
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Namespace: {}", config.namespace);
    println!("  Call timeout: {:?}", config.call_timeout);
    println!("  Poll interval: {:?}", config.poll_interval);
    println!();

    println!("{}", "Storage:".bold());
    println!("  Backend: {:?}", config.storage.backend);
    if config.storage.backend == BackendKind::Postgres {
        println!(
            "  Database: {}",
            config
                .storage
                .database_url
                .as_deref()
                .map(redact_url)
                .unwrap_or_else(|| "(missing)".red().to_string())
        );
        println!("  Max connections: {}", config.storage.max_connections);
    }
    println!();

    println!("{}", "Queue:".bold());
    println!("  Lease: {:?} · max attempts {}", config.queue.lease, config.queue.max_attempts);
    println!("  Pending scan window: {}", config.queue.pending_scan_window);
    if let Some(max) = config.queue.max_pending_per_role {
        println!("  Max pending per role: {}", max);
    }
    println!();

    println!("{}", "Context:".bold());
    println!(
        "  Chunks: {} chars, {} overlap",
        config.context.chunk_size, config.context.chunk_overlap
    );
    println!("  Learn source: {}", config.context.learn_source);
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}:{}", config.server.host, config.server.port);
    if let Some(port) = config.server.metrics_port {
        println!("  Metrics: {}", port);
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = HiveConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());
    Ok(())
}

pub fn generate(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }
    std::fs::write(output, CONFIG_TEMPLATE).with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());
    Ok(())
}

/// Hide the password component of a connection string.
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.split_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:****@{}", scheme, user, host),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_is_a_valid_config() {
        let config = HiveConfig::from_yaml_str(CONFIG_TEMPLATE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.namespace, "nova:mem");
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive-config.yaml");
        generate(&path, false).unwrap();
        assert!(generate(&path, false).is_err());
        generate(&path, true).unwrap();
    }

    #[test]
    fn test_redact_url_hides_password() {
        assert_eq!(
            redact_url("postgres://hive:s3cret@db:5432/hive"),
            "postgres://hive:****@db:5432/hive"
        );
        assert_eq!(redact_url("postgres://db/hive"), "postgres://db/hive");
    }
}
