// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP contract tests against in-memory stores.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use hive_core::application::context_index::ContextIndex;
use hive_core::application::repository_factory::StoreSet;
use hive_core::domain::chunking::ChunkingPolicy;
use hive_core::presentation::api::{app, AppState};

fn router() -> Router {
    let stores = StoreSet::in_memory("test");
    let index = ContextIndex::new(stores.context.clone(), ChunkingPolicy::default(), "historian");
    app(AppState {
        records: stores.records,
        context: Arc::new(index),
        context_store: stores.context,
        snippet_chars: 300,
    })
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(router, request).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_and_banner() {
    let router = router();
    let (status, body) = get(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (status, body) = get(&router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
}

#[tokio::test]
async fn test_write_read_search_roundtrip() {
    let router = router();
    let (status, body) = post(&router, "/memory.write", json!({"data": {"agent": "TrendFetcher", "n": 1}})).await;
    assert_eq!(status, StatusCode::OK);
    let key = body["key"].as_str().unwrap().to_string();
    assert!(key.starts_with("test:"));

    let (_, body) = post(&router, "/memory.read", json!({"key": key})).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["agent"], "TrendFetcher");
    assert_eq!(body["version"], 1);
    assert!(body["ts"].as_f64().unwrap() > 0.0);

    let (_, body) = post(&router, "/memory.search", json!({"q": "trendfetcher", "limit": 5})).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert_eq!(body["results"][0]["key"], key);
}

#[tokio::test]
async fn test_tools_prefix_is_an_alias() {
    let router = router();
    let (status, body) = post(&router, "/tools/memory.write", json!({"key": "test:fixed", "data": {"a": 1}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "test:fixed");

    let (_, body) = post(&router, "/memory.read", json!({"key": "test:fixed"})).await;
    assert_eq!(body["data"], json!({"a": 1}));
}

#[tokio::test]
async fn test_read_missing_key() {
    let router = router();
    let (status, body) = post(&router, "/memory.read", json!({"key": "test:missing"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": false, "error": "not_found"}));
}

#[tokio::test]
async fn test_malformed_bodies_are_400() {
    let router = router();
    let (status, body) = post(&router, "/memory.write", json!({"nodata": true})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "malformed");

    let (status, _) = post(&router, "/memory.write", json!({"data": [1, 2, 3]})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cas_conflict_and_not_found() {
    let router = router();
    post(&router, "/memory.write", json!({"key": "test:k", "data": {"v": 1}})).await;

    let (status, body) = post(&router, "/memory.cas", json!({"key": "test:k", "version": 1, "data": {"v": 2}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    let (status, body) = post(&router, "/memory.cas", json!({"key": "test:k", "version": 1, "data": {"v": 3}})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) = post(&router, "/memory.cas", json!({"key": "test:nope", "version": 1, "data": {}})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_context_search_limit_bounds() {
    let router = router();
    let (status, _) = get(&router, "/search?query=x&limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&router, "/search?query=x&limit=51").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = get(&router, "/search?limit=5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = get(&router, "/search?query=x&limit=50").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_learn_then_search_returns_snippet() {
    let router = router();
    let long_body = format!("Pricing tiers {}", "x".repeat(1000));
    let (status, ack) = post(&router, "/learn", json!({"title": "Pricing Model", "body": long_body, "tags": ["sales"]})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack, json!({"status": "ok", "doc_id": "pricing-model", "chunk_id": "0", "chunks": 1}));

    let (_, body) = get(&router, "/search?query=Pricing%20Model&limit=5").await;
    assert_eq!(body["mode"], "ranked");
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["doc_id"], "pricing-model");
    assert_eq!(body["results"][0]["snippet"].as_str().unwrap().chars().count(), 300);
    assert!(body["results"][0]["score"].as_f64().unwrap() >= 10.0);

    let (_, ack) = post(&router, "/learn", json!({"title": "Pricing Model", "body": "replaced"})).await;
    assert_eq!(ack["status"], "updated");
}

#[tokio::test]
async fn test_upsert_and_fetch_context() {
    let router = router();
    let (status, ack) = post(
        &router,
        "/upsert",
        json!({"source": "dashboard", "doc_id": "runbook", "chunk_id": "0", "content": "Restart the ingest worker first."}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["status"], "ok");

    let (_, result) = post(&router, "/context.fetch", json!({"query": "ingest worker", "k": 3})).await;
    assert_eq!(result["mode"], "ranked");
    assert_eq!(result["chunks"][0]["content"], "Restart the ingest worker first.");

    let (_, result) = post(&router, "/context.fetch", json!({"query": "gest wor", "k": 3})).await;
    assert_eq!(result["mode"], "fallback");
    assert_eq!(result["chunks"][0]["score"], 0.0);
}

#[tokio::test]
async fn test_empty_learn_body_is_400() {
    let router = router();
    let (status, body) = post(&router, "/learn", json!({"title": "t", "body": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_huge_counts_are_capped_not_rejected() {
    let router = router();
    for i in 0..55 {
        let (status, _) = post(
            &router,
            "/learn",
            json!({"title": format!("Note {}", i), "body": "shared keyword"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, result) = post(&router, "/context.fetch", json!({"query": "keyword", "k": u64::MAX})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["chunks"].as_array().unwrap().len(), 50);

    post(&router, "/memory.write", json!({"data": {"note": "needle"}})).await;
    let (status, body) = post(
        &router,
        "/memory.search",
        json!({"q": "needle", "limit": 5, "window": u64::MAX}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}
