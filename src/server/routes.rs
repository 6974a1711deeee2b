//! HTTP API Route Definitions

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;

use super::handlers::{self, AppState};

/// Create the API router with all routes
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/crawl", post(handlers::crawl))
        .route("/api/search", get(handlers::search))
        .route("/api/stats", get(handlers::stats))
        .route("/api/index", delete(handlers::clear_index))
        .layer(CatchPanicLayer::custom(handlers::handle_panic))
        .with_state(app_state)
}
