// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! `hive serve` - HTTP API over the configured stores
//!
//! Also runs the lease reaper and, when `server.metrics_port` is set, the
//! Prometheus exporter. Ctrl+C or SIGTERM drains in-flight requests and
//! stops the reaper before exiting.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use hive_core::application::context_index::{ContextIndex, ContextService};
use hive_core::application::repository_factory::StoreSet;
use hive_core::application::task_queue::TaskQueue;
use hive_core::domain::config::HiveConfig;
use hive_core::presentation::api::{app, AppState};
use hive_swarm::application::LeaseReaper;

use super::shutdown_signal;

#[derive(Args)]
pub struct ServeArgs {
    /// Bind address (overrides server.host)
    #[arg(long, env = "HIVE_HOST")]
    host: Option<String>,

    /// Bind port (overrides server.port)
    #[arg(long, env = "HIVE_PORT")]
    port: Option<u16>,
}

pub async fn execute(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = HiveConfig::load_or_default(config_path).context("Failed to load configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate().context("Configuration validation failed")?;

    if let Some(port) = config.server.metrics_port {
        let addr: SocketAddr = format!("{}:{}", config.server.host, port)
            .parse()
            .with_context(|| format!("Invalid metrics address {}:{}", config.server.host, port))?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Metrics exporter listening on {}", addr);
    }

    let stores = StoreSet::open(&config).await.context("Failed to open stores")?;
    let context: Arc<dyn ContextService> = Arc::new(ContextIndex::new(
        stores.context.clone(),
        config.chunking_policy()?,
        config.context.learn_source.clone(),
    ));

    let shutdown = CancellationToken::new();
    let queue = Arc::new(TaskQueue::new(stores.records.clone(), config.queue.clone()));
    let reaper = Arc::new(
        LeaseReaper::new(queue, config.queue.reap_interval).with_shutdown_token(shutdown.clone()),
    );
    let reaper_handle = reaper.start();

    let router = app(AppState {
        records: stores.records.clone(),
        context,
        context_store: stores.context.clone(),
        snippet_chars: config.context.snippet_chars,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("{} {}", "hive server listening on".green(), addr.bold());
    info!(namespace = %config.namespace, backend = ?config.storage.backend, "Server started on {}", addr);

    let token = shutdown.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            token.cancel();
        })
        .await
        .context("HTTP server failed")?;

    shutdown.cancel();
    reaper_handle.await.context("Lease reaper task panicked")?;
    info!("Server shut down");

    Ok(())
}
