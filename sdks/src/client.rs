// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use hive_core::application::context_index::{ContextAck, UpsertRequest};
use hive_core::domain::context::ContextResult;
use hive_core::presentation::dto::{
    CasRequest, CasResponse, ContextFetchRequest, ContextSearchResponse, ErrorResponse, LearnRequest,
    ReadRequest, ReadResponse, SearchHit, SearchRequest, SearchResponse, WriteRequest, WriteResponse,
};

use crate::error::ClientError;

/// Client for a hive memory server.
#[derive(Clone)]
pub struct HiveClient {
    base_url: Url,
    client: Client,
}

impl HiveClient {
    /// Create a client whose every call is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let trimmed = base_url.trim_end_matches('/');
        let base_url = Url::parse(&format!("{}/", trimmed)).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!("unsupported scheme '{}'", base_url.scheme())));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Succeeds when the server and both of its stores are reachable.
    pub async fn health(&self) -> Result<(), ClientError> {
        let req = self.client.get(self.url("health")?);
        let _: Value = self.send(req).await?;
        Ok(())
    }

    /// Store `data` (a JSON object) and return its key.
    pub async fn write(&self, data: Value, key: Option<String>) -> Result<String, ClientError> {
        let response: WriteResponse = self.post("memory.write", &WriteRequest { key, data }).await?;
        Ok(response.key)
    }

    /// `None` when nothing is stored under `key`.
    pub async fn read(&self, key: &str) -> Result<Option<ReadResponse>, ClientError> {
        let response: ReadResponse = self
            .post("memory.read", &ReadRequest { key: key.to_string() })
            .await?;
        Ok(response.ok.then_some(response))
    }

    pub async fn search(&self, q: &str, limit: usize, window: Option<usize>) -> Result<Vec<SearchHit>, ClientError> {
        let request = SearchRequest {
            q: q.to_string(),
            limit,
            window,
        };
        let response: SearchResponse = self.post("memory.search", &request).await?;
        Ok(response.results)
    }

    pub async fn compare_and_swap(&self, key: &str, version: i64, data: Value) -> Result<CasResponse, ClientError> {
        let request = CasRequest {
            key: key.to_string(),
            version,
            data,
        };
        self.post("memory.cas", &request).await
    }

    /// Snippet search, `GET /search`.
    pub async fn search_context(&self, query: &str, limit: i64) -> Result<ContextSearchResponse, ClientError> {
        let mut url = self.url("search")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &limit.to_string());
        self.send(self.client.get(url)).await
    }

    pub async fn learn(&self, title: &str, body: &str, tags: Vec<String>) -> Result<ContextAck, ClientError> {
        let request = LearnRequest {
            title: title.to_string(),
            body: body.to_string(),
            tags,
        };
        self.post("learn", &request).await
    }

    pub async fn upsert(&self, request: &UpsertRequest) -> Result<ContextAck, ClientError> {
        self.post("upsert", request).await
    }

    /// Full chunks, best first.
    pub async fn fetch_context(&self, query: &str, k: usize) -> Result<ContextResult, ClientError> {
        let request = ContextFetchRequest {
            query: query.to_string(),
            k,
        };
        self.post("context.fetch", &request).await
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let req = self.client.post(self.url(path)?).json(body);
        self.send(req).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let response = req.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "Hive request completed");

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: Value = response.json().await.unwrap_or_else(|_| json!({}));
        let error = serde_json::from_value::<ErrorResponse>(body).ok();
        Err(ClientError::Status {
            status,
            error: error
                .as_ref()
                .map(|e| e.error.clone())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
            detail: error.and_then(|e| e.detail),
        })
    }
}
