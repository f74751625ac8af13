use axum::extract::rejection::JsonRejection;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::llm::ServiceError;

/// Generic description attached to every failed request.
pub const FAILURE_DESCRIPTION: &str = "Failed to process request";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream service error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(msg)
            | ApiError::Upstream(msg)
            | ApiError::Internal(msg) => msg.clone(),
        };

        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, message);
        }

        let body = Json(json!({ "error": message, "message": FAILURE_DESCRIPTION }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_class() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_errors_map_to_upstream() {
        let err: ApiError = ServiceError::Timeout {
            service: "embedding".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::Upstream(msg) if msg.contains("embedding")));
    }
}
