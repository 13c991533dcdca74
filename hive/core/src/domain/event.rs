// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Audit events emitted by workers. Append-only: an event is written once
//! under a fresh key and never rewritten.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const EVENT_TYPE: &str = "event";
pub const TOPIC_HEARTBEAT: &str = "heartbeat";
pub const TOPIC_LIFECYCLE: &str = "lifecycle";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub agent: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub topic: String,
    pub payload: Value,
    pub ts: f64,
}

impl Event {
    pub fn new(
        agent: impl Into<String>,
        event_type: impl Into<String>,
        topic: impl Into<String>,
        payload: Value,
        ts: f64,
    ) -> Self {
        Self {
            agent: agent.into(),
            event_type: event_type.into(),
            topic: topic.into(),
            payload,
            ts,
        }
    }

    pub fn heartbeat(agent: impl Into<String>, ts: f64) -> Self {
        Self::new(agent, EVENT_TYPE, TOPIC_HEARTBEAT, json!({"alive": true}), ts)
    }

    pub fn lifecycle(agent: impl Into<String>, status: &str, ts: f64) -> Self {
        Self::new(agent, EVENT_TYPE, TOPIC_LIFECYCLE, json!({"status": status}), ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_layout() {
        let value = serde_json::to_value(Event::lifecycle("Executor", "starting", 12.5)).unwrap();
        assert_eq!(
            value,
            json!({
                "agent": "Executor",
                "type": "event",
                "topic": "lifecycle",
                "payload": {"status": "starting"},
                "ts": 12.5
            })
        );
    }
}
