// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;

use hive_core::application::context_index::ContextService;
use hive_core::domain::context::RetrievalMode;
use hive_core::domain::repository::{RecordStore, StoreError};
use hive_sdk::{HiveClient, HttpContextService, HttpRecordStore};

fn client(url: &str) -> Arc<HiveClient> {
    Arc::new(HiveClient::new(url, Duration::from_secs(5)).unwrap())
}

#[tokio::test]
async fn test_write_returns_server_key() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/memory.write")
        .match_body(Matcher::PartialJson(json!({"data": {"type": "artifact"}})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true,"key":"nova:mem:abc"}"#)
        .create_async()
        .await;

    let store = HttpRecordStore::new(client(&server.url()), "nova:mem");
    let key = store.write(json!({"type": "artifact"}), None).await.unwrap();

    assert_eq!(key, "nova:mem:abc");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_read_maps_not_found_to_none() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/memory.read")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":false,"error":"not_found"}"#)
        .create_async()
        .await;

    let store = HttpRecordStore::new(client(&server.url()), "nova:mem");
    assert!(store.read("nova:mem:missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_read_returns_record_with_version() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/memory.read")
        .match_body(Matcher::Json(json!({"key": "nova:mem:k1"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true,"data":{"n":2},"ts":1700000000.5,"version":3}"#)
        .create_async()
        .await;

    let store = HttpRecordStore::new(client(&server.url()), "nova:mem");
    let record = store.read("nova:mem:k1").await.unwrap().unwrap();

    assert_eq!(record.payload, json!({"n": 2}));
    assert_eq!(record.version, 3);
    assert_eq!(record.ts_seconds(), 1_700_000_000.5);
}

#[tokio::test]
async fn test_cas_conflict_becomes_store_conflict() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/memory.cas")
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":false,"error":"conflict","detail":"version moved"}"#)
        .create_async()
        .await;

    let store = HttpRecordStore::new(client(&server.url()), "nova:mem");
    let err = store
        .compare_and_swap("nova:mem:task:1", 4, json!({"status": "claimed"}))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Conflict { ref key, expected: 4 } if key == "nova:mem:task:1"));
}

#[tokio::test]
async fn test_bad_request_carries_server_detail() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/memory.write")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":false,"error":"malformed","detail":"data must be a JSON object"}"#)
        .create_async()
        .await;

    let store = HttpRecordStore::new(client(&server.url()), "nova:mem");
    let err = store.write(json!({"x": 1}), None).await.unwrap_err();

    assert!(matches!(err, StoreError::MalformedInput(ref d) if d == "data must be a JSON object"));
}

#[tokio::test]
async fn test_unreachable_server_is_connectivity() {
    let store = HttpRecordStore::new(client("http://127.0.0.1:1"), "nova:mem");
    let err = store.read("nova:mem:k").await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_search_sends_window_and_limit() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/memory.search")
        .match_body(Matcher::Json(json!({"q": "Executor", "limit": 2, "window": 50})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"ok":true,"results":[{"key":"nova:mem:a","data":{"n":1},"ts":1700000001.0,"version":1}]}"#)
        .create_async()
        .await;

    let store = HttpRecordStore::new(client(&server.url()), "nova:mem");
    let records = store.search_window("Executor", 50, 2).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, "nova:mem:a");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_context_decodes_chunks_and_mode() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/context.fetch")
        .match_body(Matcher::Json(json!({"query": "deploy", "k": 3})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "mode": "fallback",
                "chunks": [{
                    "source": "historian",
                    "doc_id": "deploy-steps",
                    "chunk_id": "deploy-steps",
                    "content": "Run migrations before deploy.",
                    "metadata": {},
                    "updated_at": "2026-01-01T00:00:00Z",
                    "score": 0.0
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let context = HttpContextService::new(client(&server.url()));
    let result = context.fetch_context("deploy", 3).await.unwrap();

    assert_eq!(result.mode, RetrievalMode::Fallback);
    assert_eq!(result.chunks.len(), 1);
    assert_eq!(result.chunks[0].chunk.doc_id, "deploy-steps");
}

#[tokio::test]
async fn test_search_context_uses_query_string() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("query".into(), "deploy steps".into()),
            Matcher::UrlEncoded("limit".into(), "3".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"query":"deploy steps","count":0,"mode":"ranked","results":[]}"#)
        .create_async()
        .await;

    let response = client(&server.url()).search_context("deploy steps", 3).await.unwrap();

    assert_eq!(response.count, 0);
    mock.assert_async().await;
}

#[test]
fn test_rejects_non_http_base_url() {
    assert!(HiveClient::new("ftp://example.com", Duration::from_secs(1)).is_err());
}
