// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Handlers
//!
//! A [`TaskHandler`] turns one claimed [`Task`] into a JSON result. Workers
//! look handlers up by `task_type` in a [`HandlerRegistry`]; the worker, not
//! the handler, is responsible for recording the result on the task.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use hive_core::domain::repository::StoreError;
use hive_core::domain::task::Task;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The task payload lacks a field the handler needs.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The `task_type` this handler serves.
    fn task_type(&self) -> &str;

    async fn handle(&self, task: &Task) -> Result<Value, HandlerError>;
}

/// Handlers keyed by `task_type`. Registering a second handler for the same
/// type replaces the first.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) -> &mut Self {
        self.handlers.insert(handler.task_type().to_string(), handler);
        self
    }

    pub fn with(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_type).cloned()
    }

    pub fn task_types(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo(&'static str);

    #[async_trait]
    impl TaskHandler for Echo {
        fn task_type(&self) -> &str {
            self.0
        }

        async fn handle(&self, task: &Task) -> Result<Value, HandlerError> {
            Ok(task.payload.clone())
        }
    }

    #[tokio::test]
    async fn test_registry_dispatches_by_task_type() {
        let registry = HandlerRegistry::new().with(Arc::new(Echo("a"))).with(Arc::new(Echo("b")));
        assert_eq!(registry.task_types(), vec!["a", "b"]);
        assert!(registry.get("c").is_none());

        let task = Task::new("a", json!({"x": 1}), "R", "P", 0.0);
        let handler = registry.get("a").unwrap();
        assert_eq!(handler.handle(&task).await.unwrap(), json!({"x": 1}));
    }
}
