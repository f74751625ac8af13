use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{config, drafts, health, sessions};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// This function sets up:
/// - CORS middleware
/// - Health and count endpoints
/// - The one-shot `process-emails` endpoint
/// - Session-scoped ingestion (emails, mailbox corpus, Q&A dataset)
/// - Four-stage drafting
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);
    Router::new()
        .route("/health", get(health::health))
        .route("/api/count", get(health::count))
        .route("/api/config", get(config::get_config))
        .route("/api/process-emails", post(drafts::process_emails))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:session_id",
            axum::routing::delete(sessions::delete_session),
        )
        .route(
            "/api/sessions/:session_id/reference-emails",
            post(sessions::upload_reference_emails),
        )
        .route(
            "/api/sessions/:session_id/corpus",
            post(sessions::upload_corpus),
        )
        .route(
            "/api/sessions/:session_id/dataset",
            post(sessions::upload_dataset),
        )
        .route("/api/sessions/:session_id/draft", post(sessions::draft))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(&state.settings.server.cors_allowed_origins)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
