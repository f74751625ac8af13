use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::drafting::DraftRequest;
use crate::rag::{DatasetEntry, Session};
use crate::server::handlers::utils::parse_session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReferenceEmailsRequest {
    pub emails: Vec<String>,
}

/// Plain-text mailbox export, one email per `Subject: ` header.
#[derive(Debug, Deserialize)]
pub struct CorpusRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct DatasetRequest {
    pub entries: Vec<DatasetEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DraftBody {
    pub question: String,
    #[serde(default)]
    pub history: Vec<String>,
}

pub async fn create_session() -> impl IntoResponse {
    let session = Session::generate();
    tracing::info!("Created session {}", session);
    Json(json!({ "sessionId": session.id() }))
}

pub async fn upload_reference_emails(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Result<Json<ReferenceEmailsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let session = parse_session(&session_id)?;
    let Json(payload) = payload?;
    let ingested = state
        .drafting
        .ingest_reference_emails(&session, &payload.emails)
        .await?;
    Ok(Json(json!({ "ingested": ingested })))
}

pub async fn upload_corpus(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Result<Json<CorpusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let session = parse_session(&session_id)?;
    let Json(payload) = payload?;
    let ingested = state
        .drafting
        .ingest_corpus(Some(&session), &payload.text)
        .await?;
    Ok(Json(json!({ "ingested": ingested })))
}

pub async fn upload_dataset(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Result<Json<DatasetRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let session = parse_session(&session_id)?;
    let Json(payload) = payload?;
    let ingested = state
        .drafting
        .ingest_dataset(&session, &payload.entries)
        .await?;
    Ok(Json(json!({ "ingested": ingested })))
}

/// Four-stage draft: dataset facts, then the session's writing style.
pub async fn draft(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    payload: Result<Json<DraftBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let session = parse_session(&session_id)?;
    let Json(payload) = payload?;
    let response = state
        .drafting
        .draft(DraftRequest::four_stage(
            payload.question,
            payload.history,
            session,
        ))
        .await?;
    Ok(Json(response))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = parse_session(&session_id)?;
    state.drafting.delete_session(&session).await?;
    Ok(Json(json!({ "status": "deleted", "sessionId": session.id() })))
}
