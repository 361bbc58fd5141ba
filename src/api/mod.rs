//! HTTP API module for health, feed, market detail and metrics endpoints.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
