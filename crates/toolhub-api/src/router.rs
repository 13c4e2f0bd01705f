//! Route definitions for the Toolhub HTTP API.
//!
//! Tool and admin routes are mounted under `/api`; the health check sits at
//! the root. The router receives `AppState` and passes it to all handlers
//! via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_upload = usize::try_from(state.config.server.max_upload_bytes).unwrap_or(usize::MAX);
    let cors = middleware::cors::build_cors_layer(&state.config.server);

    let api_routes = Router::new()
        .merge(tool_routes())
        .merge(command_routes())
        .merge(cleanup_routes());

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(handlers::health::health))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Tool submissions
fn tool_routes() -> Router<AppState> {
    Router::new().route("/mergePdfs", post(handlers::merge::merge_pdfs))
}

/// Command status polling
fn command_routes() -> Router<AppState> {
    Router::new()
        .route("/commands", get(handlers::command::list_commands))
        .route("/commands/{id}", get(handlers::command::get_command))
}

/// Temporary file cleanup administration
fn cleanup_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/cleanup", post(handlers::cleanup::run))
        .route("/admin/cleanup/stats", get(handlers::cleanup::stats))
        .route("/admin/cleanup/orphans", get(handlers::cleanup::orphans))
        .route("/admin/cleanup/preview", get(handlers::cleanup::preview))
}
