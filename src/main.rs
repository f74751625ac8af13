use std::env;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use mailcraft_backend::core::config::AppPaths;
use mailcraft_backend::core::logging;
use mailcraft_backend::graph::PipelineVariant;
use mailcraft_backend::server;
use mailcraft_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize_with_paths(paths)?;

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(state.settings.server.port);
    let bind_addr = format!("{}:{}", state.settings.server.host, port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("MAILCRAFT_PORT={}", addr.port());
    tracing::info!("Listening on {}", addr);

    for variant in [PipelineVariant::TwoStage, PipelineVariant::FourStage] {
        tracing::info!(
            "Pipeline {}: {}",
            variant.as_str(),
            state.drafting.graph(variant).stage_ids().join(" -> ")
        );
    }

    let app: Router = server::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
