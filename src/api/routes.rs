//! HTTP API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers::{comments, feed, health, load_more, market, metrics, ready, status, AppState};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        // Feed endpoints
        .route("/api/v1/status", get(status))
        .route("/api/v1/feed", get(feed))
        .route("/api/v1/feed/load-more", post(load_more))
        // Market detail endpoints
        .route("/api/v1/markets/:key", get(market))
        .route("/api/v1/markets/:key/comments", get(comments))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
