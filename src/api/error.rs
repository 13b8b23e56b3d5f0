use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::StoreError;

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::ProductNotFound(_) | StoreError::OrderNotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Validation { .. } | StoreError::Order(_) | StoreError::Bundle(_) | StoreError::Email(_) => StatusCode::BAD_REQUEST,
            StoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StoreError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Upstream(_) => StatusCode::BAD_GATEWAY,
            StoreError::Internal(_) | StoreError::Database(_) | StoreError::Migration(_) | StoreError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, details) = match self {
            StoreError::Validation { message, details } => (message, details),
            ref e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Internal Error: {:?}", e);
                ("Internal server error".to_string(), None)
            }
            StoreError::Upstream(ref msg) => {
                tracing::warn!("Upstream Error: {}", msg);
                (self.to_string(), None)
            }
            other => (other.to_string(), None),
        };
        (status, Json(json!({ "error": error, "details": details }))).into_response()
    }
}
