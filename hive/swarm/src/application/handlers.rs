// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Built-in task handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use hive_core::application::context_index::ContextService;
use hive_core::domain::task::Task;

use crate::domain::{HandlerError, HandlerRegistry, TaskHandler};

pub const PUBLISH_ARTIFACT: &str = "publish_artifact";
pub const RECALL: &str = "recall";
pub const LEARN: &str = "learn";

const DEFAULT_RECALL_K: usize = 8;

/// Acknowledges an artifact by mirroring its summary back as the result.
pub struct PublishArtifactHandler;

#[async_trait]
impl TaskHandler for PublishArtifactHandler {
    fn task_type(&self) -> &str {
        PUBLISH_ARTIFACT
    }

    async fn handle(&self, task: &Task) -> Result<Value, HandlerError> {
        let source_key = task.payload.get("source_key").cloned().unwrap_or(Value::Null);
        let summary = task
            .payload
            .get("artifact")
            .and_then(|artifact| artifact.get("payload"))
            .cloned()
            .unwrap_or_else(|| json!({}));
        Ok(json!({
            "status": "published",
            "source_key": source_key,
            "summary": summary,
        }))
    }
}

/// Answers `{query, k?}` with the most relevant context chunks.
pub struct RecallHandler {
    context: Arc<dyn ContextService>,
}

impl RecallHandler {
    pub fn new(context: Arc<dyn ContextService>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl TaskHandler for RecallHandler {
    fn task_type(&self) -> &str {
        RECALL
    }

    async fn handle(&self, task: &Task) -> Result<Value, HandlerError> {
        let query = required_str(&task.payload, "query")?;
        let k = task
            .payload
            .get("k")
            .and_then(Value::as_u64)
            .map(|k| k as usize)
            .unwrap_or(DEFAULT_RECALL_K);

        let result = self.context.fetch_context(query, k).await?;
        let results: Vec<Value> = result
            .chunks
            .iter()
            .map(|scored| {
                json!({
                    "doc_id": scored.chunk.doc_id,
                    "chunk_id": scored.chunk.chunk_id,
                    "score": scored.score,
                    "content": scored.chunk.content,
                })
            })
            .collect();
        Ok(json!({"status": "ok", "mode": result.mode, "results": results}))
    }
}

/// Stores `{title, body, tags?}` in the context index.
pub struct LearnHandler {
    context: Arc<dyn ContextService>,
}

impl LearnHandler {
    pub fn new(context: Arc<dyn ContextService>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl TaskHandler for LearnHandler {
    fn task_type(&self) -> &str {
        LEARN
    }

    async fn handle(&self, task: &Task) -> Result<Value, HandlerError> {
        let title = required_str(&task.payload, "title")?;
        let body = required_str(&task.payload, "body")?;
        let tags: Vec<String> = task
            .payload
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();

        let ack = self.context.learn(title, body, tags).await?;
        serde_json::to_value(ack).map_err(|e| HandlerError::Failed(e.to_string()))
    }
}

fn required_str<'a>(payload: &'a Value, field: &str) -> Result<&'a str, HandlerError> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| HandlerError::InvalidPayload(format!("missing string field '{}'", field)))
}

/// Names accepted by [`builtin_handler`].
pub const BUILTIN_HANDLERS: &[&str] = &[PUBLISH_ARTIFACT, RECALL, LEARN];

pub fn builtin_handler(name: &str, context: Arc<dyn ContextService>) -> Option<Arc<dyn TaskHandler>> {
    match name {
        PUBLISH_ARTIFACT => Some(Arc::new(PublishArtifactHandler)),
        RECALL => Some(Arc::new(RecallHandler::new(context))),
        LEARN => Some(Arc::new(LearnHandler::new(context))),
        _ => None,
    }
}

/// Registry holding every built-in handler.
pub fn builtin_registry(context: Arc<dyn ContextService>) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for name in BUILTIN_HANDLERS {
        if let Some(handler) = builtin_handler(name, context.clone()) {
            registry.register(handler);
        }
    }
    registry
}
