use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Liveness counter kept for clients of the original API.
pub async fn count() -> impl IntoResponse {
    Json(json!({ "count": 1 }))
}
