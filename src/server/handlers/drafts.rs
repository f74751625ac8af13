use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::server::handlers::utils::parse_session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessEmailsRequest {
    pub email: String,
    #[serde(default)]
    pub user_emails: Vec<String>,
    pub session_id: Option<String>,
}

/// Ingest the caller's past emails and draft a reply in their style.
pub async fn process_emails(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProcessEmailsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let session = payload
        .session_id
        .as_deref()
        .map(parse_session)
        .transpose()?;

    let response = state
        .drafting
        .process_emails(&payload.email, &payload.user_emails, session)
        .await?;
    Ok(Json(response))
}
