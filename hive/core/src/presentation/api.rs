// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API
//!
//! JSON endpoints over the record store and the context index. The record
//! and context tools are mounted twice, at the root and under `/tools`, so
//! workers built against either layout keep working.
//!
//! | Route | Body | Reply |
//! |-------|------|-------|
//! | `POST /memory.write` | `{key?, data}` | `{ok, key}` |
//! | `POST /memory.read` | `{key}` | `{ok, data, ts, version}` / `{ok:false, error:"not_found"}` |
//! | `POST /memory.search` | `{q, limit, window?}` | `{ok, results}` |
//! | `POST /memory.cas` | `{key, version, data}` | `{ok, key, version, ts}`, 409 on conflict |
//! | `GET /search?query=&limit=` | | `{query, count, mode, results}` |
//! | `POST /upsert` | `{source, doc_id, chunk_id?, content, metadata?}` | ack |
//! | `POST /learn` | `{title, body, tags?}` | ack |
//! | `POST /context.fetch` | `{query, k}` | `{mode, chunks}` |

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::application::context_index::{ContextAck, ContextService, UpsertRequest};
use crate::domain::context::ContextResult;
use crate::domain::repository::{ContextStore, RecordStore, StoreError};
use crate::presentation::dto::{
    CasRequest, CasResponse, ContextFetchRequest, ContextSearchQuery, ContextSearchResponse,
    ErrorResponse, LearnRequest, ReadRequest, ReadResponse, SearchHit, SearchRequest,
    SearchResponse, WriteRequest, WriteResponse, MAX_CONTEXT_LIMIT,
};

pub struct AppState {
    pub records: Arc<dyn RecordStore>,
    pub context: Arc<dyn ContextService>,
    pub context_store: Arc<dyn ContextStore>,
    pub snippet_chars: usize,
}

pub fn app(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(tool_routes())
        .nest("/tools", tool_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn tool_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/memory.write", post(write_record))
        .route("/memory.read", post(read_record))
        .route("/memory.search", post(search_records))
        .route("/memory.cas", post(compare_and_swap))
        .route("/search", get(search_context))
        .route("/upsert", post(upsert_context))
        .route("/learn", post(learn))
        .route("/context.fetch", post(fetch_context))
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "malformed", detail),
            ApiError::Store(err) => {
                let detail = err.to_string();
                match err {
                    StoreError::MalformedInput(_) => (StatusCode::BAD_REQUEST, "malformed", detail),
                    StoreError::Connectivity(_) => {
                        warn!(error = %detail, "Store unavailable");
                        (StatusCode::SERVICE_UNAVAILABLE, "unavailable", detail)
                    }
                    StoreError::Conflict { .. } => (StatusCode::CONFLICT, "conflict", detail),
                    StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", detail),
                    StoreError::Persistence(_) | StoreError::Serialization(_) => {
                        error!(error = %detail, "Store failure");
                        (StatusCode::INTERNAL_SERVER_ERROR, "internal", detail)
                    }
                }
            }
        };
        let body = ErrorResponse {
            ok: false,
            error: error.to_string(),
            detail: Some(detail),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn root() -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "service": "Hive Memory API",
        "endpoints": [
            "/health",
            "/memory.write",
            "/memory.read",
            "/memory.search",
            "/memory.cas",
            "/search?query=...&limit=5",
            "/upsert",
            "/learn",
            "/context.fetch"
        ]
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let probe = async {
        state.records.ping().await?;
        state.context_store.ping().await
    };
    match probe.await {
        Ok(()) => Json(json!({"ok": true})).into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"ok": false, "error": e.to_string()})),
            )
                .into_response()
        }
    }
}

async fn write_record(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WriteRequest>, JsonRejection>,
) -> ApiResult<WriteResponse> {
    let Json(request) = payload?;
    if !request.data.is_object() {
        return Err(ApiError::BadRequest("data must be a JSON object".to_string()));
    }
    let key = state.records.write(request.data, request.key).await?;
    Ok(Json(WriteResponse { ok: true, key }))
}

async fn read_record(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReadRequest>, JsonRejection>,
) -> ApiResult<ReadResponse> {
    let Json(request) = payload?;
    let response = match state.records.read(&request.key).await? {
        Some(record) => ReadResponse::found(&record),
        None => ReadResponse::not_found(),
    };
    Ok(Json(response))
}

async fn search_records(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<SearchResponse> {
    let Json(request) = payload?;
    let window = request.window.unwrap_or(request.limit);
    let results = state
        .records
        .search_window(&request.q, window, request.limit)
        .await?
        .into_iter()
        .map(SearchHit::from)
        .collect();
    Ok(Json(SearchResponse { ok: true, results }))
}

async fn compare_and_swap(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CasRequest>, JsonRejection>,
) -> ApiResult<CasResponse> {
    let Json(request) = payload?;
    if !request.data.is_object() {
        return Err(ApiError::BadRequest("data must be a JSON object".to_string()));
    }
    let record = state
        .records
        .compare_and_swap(&request.key, request.version, request.data)
        .await?;
    Ok(Json(CasResponse {
        ok: true,
        ts: record.ts_seconds(),
        key: record.key,
        version: record.version,
    }))
}

async fn search_context(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ContextSearchQuery>, QueryRejection>,
) -> ApiResult<ContextSearchResponse> {
    let Query(params) = query?;
    if !(1..=MAX_CONTEXT_LIMIT).contains(&params.limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_CONTEXT_LIMIT
        )));
    }
    let result = state.context.fetch_context(&params.query, params.limit as usize).await?;
    Ok(Json(ContextSearchResponse::new(
        params.query,
        result.mode,
        &result.chunks,
        state.snippet_chars,
    )))
}

async fn upsert_context(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpsertRequest>, JsonRejection>,
) -> ApiResult<ContextAck> {
    let Json(request) = payload?;
    Ok(Json(state.context.upsert(request).await?))
}

async fn learn(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LearnRequest>, JsonRejection>,
) -> ApiResult<ContextAck> {
    let Json(request) = payload?;
    Ok(Json(state.context.learn(&request.title, &request.body, request.tags).await?))
}

async fn fetch_context(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ContextFetchRequest>, JsonRejection>,
) -> ApiResult<ContextResult> {
    let Json(request) = payload?;
    let k = request.k.min(MAX_CONTEXT_LIMIT as usize);
    Ok(Json(state.context.fetch_context(&request.query, k).await?))
}
