// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Store access for CLI commands
//!
//! Commands run against a remote server when `--server` is given and
//! against the configured stores directly otherwise. Both paths hand out
//! the same trait objects, so command code never knows which one it got.
//! The in-memory backend is only reachable through a server: a store that
//! dies with the CLI process would silently drop every write.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use hive_core::application::audit_trail::AuditTrail;
use hive_core::application::context_index::{ContextIndex, ContextService};
use hive_core::application::repository_factory::StoreSet;
use hive_core::application::task_queue::TaskQueue;
use hive_core::domain::config::{BackendKind, HiveConfig};
use hive_core::domain::repository::RecordStore;
use hive_core::infrastructure::db::Database;
use hive_sdk::{HiveClient, HttpContextService, HttpRecordStore};

pub struct Backend {
    pub config: HiveConfig,
    pub records: Arc<dyn RecordStore>,
    pub context: Arc<dyn ContextService>,
    /// Set only for a direct PostgreSQL connection.
    pub database: Option<Database>,
}

impl Backend {
    /// Load and validate configuration, then connect.
    pub async fn connect(config_path: Option<PathBuf>, server: Option<&str>) -> Result<Self> {
        let config = HiveConfig::load_or_default(config_path).context("Failed to load configuration")?;
        config.validate().context("Configuration validation failed")?;
        Self::from_config(config, server).await
    }

    pub async fn from_config(config: HiveConfig, server: Option<&str>) -> Result<Self> {
        match server {
            Some(url) => Self::remote(config, url),
            None => {
                ensure_durable(&config)?;
                Self::embedded(config).await
            }
        }
    }

    pub fn remote(config: HiveConfig, url: &str) -> Result<Self> {
        info!(server = url, "Using remote hive server");
        let client = Arc::new(
            HiveClient::new(url, config.call_timeout)
                .with_context(|| format!("Invalid server URL: {}", url))?,
        );
        Ok(Self {
            records: Arc::new(HttpRecordStore::new(client.clone(), config.namespace.clone())),
            context: Arc::new(HttpContextService::new(client)),
            database: None,
            config,
        })
    }

    pub async fn embedded(config: HiveConfig) -> Result<Self> {
        let stores = StoreSet::open(&config).await.context("Failed to open stores")?;
        let context = ContextIndex::new(
            stores.context,
            config.chunking_policy()?,
            config.context.learn_source.clone(),
        );
        Ok(Self {
            records: stores.records,
            context: Arc::new(context),
            database: stores.database,
            config,
        })
    }

    pub fn task_queue(&self) -> Arc<TaskQueue> {
        Arc::new(TaskQueue::new(self.records.clone(), self.config.queue.clone()))
    }

    pub fn audit_trail(&self) -> Arc<AuditTrail> {
        Arc::new(AuditTrail::new(self.records.clone(), self.config.audit.buffer_capacity))
    }
}

fn ensure_durable(config: &HiveConfig) -> Result<()> {
    if config.storage.backend == BackendKind::Memory {
        anyhow::bail!(
            "The memory backend does not outlive this command. Run `hive serve` and pass \
             --server http://{}:{} (or set HIVE_SERVER), or configure storage.backend: postgres",
            config.server.host,
            config.server.port
        );
    }
    Ok(())
}
