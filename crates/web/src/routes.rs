//! Router setup.

use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Largest accepted request body; PDF batches can be large.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Create the router with every page and API route.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/train", post(handlers::train))
        .route("/ask", post(handlers::ask))
        .route("/reset", post(handlers::reset))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
