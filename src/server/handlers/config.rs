use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Merged configuration with secrets masked.
pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.config.redacted()?))
}
