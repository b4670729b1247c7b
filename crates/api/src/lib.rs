//! `api` crate — thin HTTP surface that hosts the engine for one-shot
//! execution.
//!
//! Exposes:
//!   POST /api/v1/execute    { workflow, parallel? } -> ExecutionResult
//!   POST /api/v1/validate   workflow                -> { valid, order } | { valid, error }
//!   GET  /health
//!
//! No persistence and no auth — a workflow arrives fully formed in the
//! request body, is executed once, and the result is returned directly.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use engine::EngineConfig;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
}

async fn health() -> &'static str {
    "ok"
}

pub async fn serve(bind: &str, config: EngineConfig) -> Result<(), std::io::Error> {
    let state = AppState { config: Arc::new(config) };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let api_router = Router::new()
        .route("/execute", post(handlers::execute::execute))
        .route("/validate", post(handlers::validate::validate));

    let app = Router::new()
        .nest("/api/v1", api_router)
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await
}
