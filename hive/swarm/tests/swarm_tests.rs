// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use hive_core::application::audit_trail::AuditTrail;
use hive_core::application::context_index::{ContextIndex, ContextService};
use hive_core::application::task_queue::TaskQueue;
use hive_core::domain::chunking::ChunkingPolicy;
use hive_core::domain::config::QueueConfig;
use hive_core::domain::repository::RecordStore;
use hive_core::domain::task::TaskStatus;
use hive_core::infrastructure::repositories::{InMemoryContextStore, InMemoryRecordStore};
use hive_swarm::application::{builtin_registry, LeaseReaper, PollingWorker, WorkerSettings};

fn settings(role: &str, worker_id: &str) -> WorkerSettings {
    WorkerSettings {
        role: role.to_string(),
        worker_id: worker_id.to_string(),
        poll_interval: Duration::from_millis(10),
        heartbeat_every: Duration::from_secs(60),
        batch_size: 20,
    }
}

#[tokio::test]
async fn test_planner_artifact_is_published_by_executor() {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new("nova:mem"));
    let context: Arc<dyn ContextService> = Arc::new(ContextIndex::new(
        Arc::new(InMemoryContextStore::new()),
        ChunkingPolicy::default(),
        "historian",
    ));
    let queue = Arc::new(TaskQueue::new(store.clone(), QueueConfig::default()));
    let audit = Arc::new(AuditTrail::new(store.clone(), 16));

    // Planner writes an artifact, then hands it to the executor role.
    let artifact = json!({"type": "artifact", "payload": {"plan": "ship v2"}});
    let source_key = store.write(artifact.clone(), None).await.unwrap();
    let task_key = queue
        .enqueue(
            "publish_artifact",
            json!({"source_key": source_key, "artifact": artifact}),
            "Executor",
            "Planner",
        )
        .await
        .unwrap();

    let worker = PollingWorker::new(
        settings("Executor", "executor-1"),
        queue.clone(),
        audit.clone(),
        builtin_registry(context),
    );
    let report = worker.poll_once().await.unwrap();
    assert_eq!(report.completed, 1);

    let task = queue.get(&task_key).await.unwrap().unwrap().task;
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.claimed_by.as_deref(), Some("executor-1"));
    assert_eq!(
        task.result,
        Some(json!({"status": "published", "source_key": source_key, "summary": {"plan": "ship v2"}}))
    );

    // A second pass finds nothing left to do.
    assert_eq!(worker.poll_once().await.unwrap().claimed, 0);
}

#[tokio::test]
async fn test_reaper_requeues_abandoned_claim() {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryRecordStore::new("nova:mem"));
    let config = QueueConfig {
        lease: Duration::from_millis(20),
        ..QueueConfig::default()
    };
    let queue = Arc::new(TaskQueue::new(store, config));
    let key = queue.enqueue("publish_artifact", json!({}), "Executor", "Planner").await.unwrap();

    // Claimed by a worker that then disappears.
    assert!(queue.claim(&key, "crashed-worker").await.unwrap().is_some());

    let reaper = Arc::new(LeaseReaper::new(queue.clone(), Duration::from_millis(10)));
    let token = reaper.shutdown_token();
    let handle = reaper.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    handle.await.unwrap();

    let task = queue.get(&key).await.unwrap().unwrap().task;
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.claimed_by, None);
    assert_eq!(queue.find_pending("Executor", 10).await.unwrap().len(), 1);
}
