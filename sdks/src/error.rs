// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use hive_core::domain::repository::StoreError;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {error}")]
    Status {
        status: StatusCode,
        error: String,
        detail: Option<String>,
    },

    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http(e) => e.status(),
            ClientError::Status { status, .. } => Some(*status),
            ClientError::InvalidUrl(_) => None,
        }
    }

    fn message(&self) -> String {
        match self {
            ClientError::Status { error, detail, .. } => detail.clone().unwrap_or_else(|| error.clone()),
            other => other.to_string(),
        }
    }
}

impl From<ClientError> for StoreError {
    fn from(err: ClientError) -> Self {
        if let ClientError::Http(e) = &err {
            if e.is_timeout() || e.is_connect() {
                return StoreError::Connectivity(err.to_string());
            }
            if e.is_decode() {
                return StoreError::Serialization(err.to_string());
            }
        }
        match err.status() {
            Some(StatusCode::BAD_REQUEST) => StoreError::MalformedInput(err.message()),
            Some(StatusCode::NOT_FOUND) => StoreError::NotFound(err.message()),
            Some(StatusCode::SERVICE_UNAVAILABLE)
            | Some(StatusCode::GATEWAY_TIMEOUT)
            | Some(StatusCode::BAD_GATEWAY) => StoreError::Connectivity(err.message()),
            _ => StoreError::Persistence(err.message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: StatusCode, detail: &str) -> ClientError {
        ClientError::Status {
            status: code,
            error: "x".to_string(),
            detail: Some(detail.to_string()),
        }
    }

    #[test]
    fn test_status_codes_map_to_store_errors() {
        assert!(matches!(
            StoreError::from(status(StatusCode::BAD_REQUEST, "bad")),
            StoreError::MalformedInput(d) if d == "bad"
        ));
        assert!(matches!(
            StoreError::from(status(StatusCode::NOT_FOUND, "gone")),
            StoreError::NotFound(_)
        ));
        assert!(StoreError::from(status(StatusCode::SERVICE_UNAVAILABLE, "down")).is_transient());
        assert!(matches!(
            StoreError::from(status(StatusCode::INTERNAL_SERVER_ERROR, "oops")),
            StoreError::Persistence(_)
        ));
    }
}
