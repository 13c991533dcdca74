// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Hive Configuration
//
// Settings a hive host honours:
// - durable store selection and connection string
// - key namespace prefix
// - default call timeout and worker polling interval
// - task lease / retry policy and queue depth limit
// - chunking of learned documents
// - HTTP listener and audit buffering

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::chunking::{ChunkingPolicy, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::domain::repository::{PostgresConfig, StorageBackend};

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "HIVE_CONFIG_PATH";

/// Top-level configuration document (`hive-config.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfig {
    /// Key namespace prefix; generated keys look like `<namespace>:<uuid>`
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Upper bound on every store call
    #[serde(default = "default_call_timeout", with = "humantime_serde")]
    pub call_timeout: Duration,

    /// Delay between worker poll cycles
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// PostgreSQL connection string (required for the postgres backend)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply embedded migrations when the server starts
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// How long a claim stays valid before the task may be taken over
    #[serde(default = "default_lease", with = "humantime_serde")]
    pub lease: Duration,

    /// Claims allowed before an abandoned task is closed as failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Recency-index entries scanned when looking for pending work
    #[serde(default = "default_pending_scan_window")]
    pub pending_scan_window: usize,

    /// Refuse new tasks for a role once this many are visibly pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pending_per_role: Option<usize>,

    /// How often the server sweeps expired leases
    #[serde(default = "default_reap_interval", with = "humantime_serde")]
    pub reap_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// `source` column used for documents stored through `learn`
    #[serde(default = "default_learn_source")]
    pub learn_source: String,

    /// Characters of content returned as a search snippet
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Prometheus exporter port; disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Failed events kept for retry before the oldest are dropped
    #[serde(default = "default_audit_buffer")]
    pub buffer_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_heartbeat_every", with = "humantime_serde")]
    pub heartbeat_every: Duration,

    /// Pending tasks fetched per poll cycle
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_namespace() -> String {
    "nova:mem".to_string()
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_backend() -> BackendKind {
    BackendKind::Memory
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_lease() -> Duration {
    Duration::from_secs(300)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_pending_scan_window() -> usize {
    500
}

fn default_reap_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_learn_source() -> String {
    "historian".to_string()
}

fn default_snippet_chars() -> usize {
    300
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_audit_buffer() -> usize {
    256
}

fn default_heartbeat_every() -> Duration {
    Duration::from_secs(60)
}

fn default_batch_size() -> usize {
    20
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_url: None,
            max_connections: default_max_connections(),
            auto_migrate: true,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lease: default_lease(),
            max_attempts: default_max_attempts(),
            pending_scan_window: default_pending_scan_window(),
            max_pending_per_role: None,
            reap_interval: default_reap_interval(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            learn_source: default_learn_source(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_port: None,
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_audit_buffer(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            heartbeat_every: default_heartbeat_every(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            call_timeout: default_call_timeout(),
            poll_interval: default_poll_interval(),
            storage: StorageConfig::default(),
            queue: QueueConfig::default(),
            context: ContextConfig::default(),
            server: ServerConfig::default(),
            audit: AuditConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl HiveConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Candidate locations in precedence order
    /// 1. HIVE_CONFIG_PATH environment variable
    /// 2. ./hive-config.yaml (working directory)
    /// 3. ~/.hive/config.yaml (user home)
    /// 4. /etc/hive/config.yaml (system, Unix)
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }
        paths.push(PathBuf::from("./hive-config.yaml"));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".hive").join("config.yaml"));
        }
        #[cfg(unix)]
        paths.push(PathBuf::from("/etc/hive/config.yaml"));
        paths
    }

    /// Discover configuration file using precedence order
    pub fn discover_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|path| path.exists())
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    /// This allows container deployments to override config via env vars
    pub fn apply_env_overrides(&mut self) {
        let database_url = std::env::var("HIVE_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty());
        if let Some(url) = database_url {
            tracing::info!("Environment override: database URL (postgres backend)");
            self.storage.database_url = Some(url.trim().to_string());
            self.storage.backend = BackendKind::Postgres;
        }

        if let Ok(backend) = std::env::var("HIVE_STORAGE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "memory" => self.storage.backend = BackendKind::Memory,
                "postgres" | "postgresql" => self.storage.backend = BackendKind::Postgres,
                _ => tracing::warn!(
                    "Invalid value for HIVE_STORAGE_BACKEND: '{}'. Expected memory/postgres. Ignoring.",
                    backend
                ),
            }
        }

        if let Ok(namespace) = std::env::var("HIVE_NAMESPACE") {
            tracing::info!("Environment override: HIVE_NAMESPACE={}", namespace);
            self.namespace = namespace;
        }

        override_duration("HIVE_CALL_TIMEOUT", &mut self.call_timeout);
        override_duration("HIVE_POLL_INTERVAL", &mut self.poll_interval);
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.trim().is_empty() {
            anyhow::bail!("namespace must not be empty");
        }
        if self.namespace.chars().any(char::is_whitespace) {
            anyhow::bail!("namespace '{}' must not contain whitespace", self.namespace);
        }
        if self.call_timeout.is_zero() {
            anyhow::bail!("call_timeout must be greater than zero");
        }
        if self.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than zero");
        }
        if self.storage.backend == BackendKind::Postgres && self.storage.database_url.is_none() {
            anyhow::bail!("storage.database_url is required for the postgres backend");
        }
        if self.storage.max_connections == 0 {
            anyhow::bail!("storage.max_connections must be at least 1");
        }
        if self.queue.lease.is_zero() {
            anyhow::bail!("queue.lease must be greater than zero");
        }
        if self.queue.max_attempts == 0 {
            anyhow::bail!("queue.max_attempts must be at least 1");
        }
        if self.queue.pending_scan_window == 0 {
            anyhow::bail!("queue.pending_scan_window must be at least 1");
        }
        if self.queue.max_pending_per_role == Some(0) {
            anyhow::bail!("queue.max_pending_per_role must be at least 1 when set");
        }
        if self.queue.reap_interval.is_zero() {
            anyhow::bail!("queue.reap_interval must be greater than zero");
        }
        if self.worker.batch_size == 0 {
            anyhow::bail!("worker.batch_size must be at least 1");
        }
        self.chunking_policy()?;
        if self.context.learn_source.trim().is_empty() {
            anyhow::bail!("context.learn_source must not be empty");
        }
        Ok(())
    }

    pub fn chunking_policy(&self) -> anyhow::Result<ChunkingPolicy> {
        ChunkingPolicy::new(self.context.chunk_size, self.context.chunk_overlap)
            .map_err(|e| anyhow::anyhow!("invalid context chunking: {}", e))
    }

    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.storage.backend {
            BackendKind::Memory => Ok(StorageBackend::InMemory),
            BackendKind::Postgres => {
                let connection_string = self.storage.database_url.clone().ok_or_else(|| {
                    anyhow::anyhow!("storage.database_url is required for the postgres backend")
                })?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string,
                    max_connections: self.storage.max_connections,
                }))
            }
        }
    }
}

fn override_duration(var: &str, target: &mut Duration) {
    if let Ok(raw) = std::env::var(var) {
        match humantime_serde::re::humantime::parse_duration(&raw) {
            Ok(value) => {
                tracing::info!("Environment override: {}={}", var, raw);
                *target = value;
            }
            Err(e) => tracing::warn!("Invalid value for {}: '{}' ({}). Ignoring.", var, raw, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HiveConfig::default();
        assert_eq!(config.namespace, "nova:mem");
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.context.chunk_size, 3000);
        assert_eq!(config.context.chunk_overlap, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
namespace: swarm:test
poll_interval: 2s
queue:
  lease: 90s
  max_pending_per_role: 100
storage:
  backend: postgres
  database_url: postgres://hive@localhost/hive
"#;
        let config = HiveConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.namespace, "swarm:test");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.queue.lease, Duration::from_secs(90));
        assert_eq!(config.queue.max_attempts, 3);
        assert_eq!(config.queue.max_pending_per_role, Some(100));
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert!(matches!(config.storage_backend().unwrap(), StorageBackend::PostgreSQL(_)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let mut config = HiveConfig::default();
        config.server.metrics_port = Some(9100);
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = HiveConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.server.metrics_port, Some(9100));
        assert_eq!(parsed.queue.lease, config.queue.lease);
    }

    #[test]
    fn test_validation() {
        let mut config = HiveConfig::default();

        config.namespace = "".to_string();
        assert!(config.validate().is_err());
        config.namespace = "nova:mem".to_string();

        config.storage.backend = BackendKind::Postgres;
        assert!(config.validate().is_err());
        config.storage.database_url = Some("postgres://localhost/hive".to_string());
        assert!(config.validate().is_ok());

        config.context.chunk_overlap = config.context.chunk_size;
        assert!(config.validate().is_err());
        config.context.chunk_overlap = 300;

        config.queue.max_attempts = 0;
        assert!(config.validate().is_err());
        config.queue.max_attempts = 3;

        config.queue.reap_interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.queue.reap_interval = Duration::from_secs(30);
        assert!(config.validate().is_ok());

        config.worker.batch_size = 0;
        assert!(config.validate().is_err());
        config.worker.batch_size = 20;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_reap_interval_from_yaml_is_rejected() {
        let config = HiveConfig::from_yaml_str("queue:\n  reap_interval: 0s\n").unwrap();
        assert_eq!(config.queue.reap_interval, Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reap_interval"));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let missing = PathBuf::from("/definitely/not/here/hive-config.yaml");
        assert!(HiveConfig::load_or_default(Some(missing)).is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive-config.yaml");
        std::fs::write(&path, "namespace: from:file\n").unwrap();
        let config = HiveConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.namespace, "from:file");
    }
}
