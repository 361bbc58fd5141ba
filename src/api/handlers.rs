//! HTTP API handlers.

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::catalog::{mock_comments, AmplifiedCatalog, ReplicaKey};
use crate::detail::{Comment, CommentSort, CommentView, MarketDetail};
use crate::error::CatalogError;
use crate::feed::{FeedControl, FeedSnapshot};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Latest feed snapshot.
    pub snapshots: watch::Receiver<FeedSnapshot>,
    /// Command sender of the mounted feed.
    pub control: FeedControl,
    /// Amplified catalog for detail lookups.
    pub catalog: Arc<AmplifiedCatalog>,
    /// Discussion thread shown under every market.
    pub comments: Arc<[Comment]>,
    /// Prometheus renderer, when a recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state over a mounted feed.
    pub fn new(
        snapshots: watch::Receiver<FeedSnapshot>,
        control: FeedControl,
        catalog: Arc<AmplifiedCatalog>,
    ) -> Self {
        Self {
            snapshots,
            control,
            catalog,
            comments: mock_comments().into(),
            prometheus: None,
        }
    }

    /// Serve `/metrics` from this recorder.
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    /// Check if the first batch has landed.
    pub fn is_ready(&self) -> bool {
        self.snapshots.borrow().is_ready()
    }

    fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("catalog_len", &self.catalog.len())
            .field("comments", &self.comments.len())
            .field("prometheus", &self.prometheus.is_some())
            .finish()
    }
}

/// Error body returned by the API.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
}

/// Handler error carrying its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        let status = match e {
            CatalogError::InvalidKey(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Load { .. }
            | CatalogError::DuplicateId(_)
            | CatalogError::OutOfRange { .. }
            | CatalogError::FactorTooLarge(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the first batch has landed.
    pub ready: bool,
    /// Next page to fetch.
    pub page: usize,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Feed counters.
    pub feed: FeedStats,
}

/// Feed counters in status response.
#[derive(Debug, Serialize)]
pub struct FeedStats {
    /// Next page to fetch.
    pub page: usize,
    /// Whether a load is in flight.
    pub loading: bool,
    /// False once the catalog is exhausted.
    pub has_more: bool,
    /// Entries appended.
    pub displayed: usize,
    /// Entries rendered.
    pub rendered: usize,
    /// Entries in the amplified catalog.
    pub catalog_len: usize,
}

/// Accepted load-more response.
#[derive(Debug, Serialize)]
pub struct LoadMoreResponse {
    /// Always true; a request dropped by the in-flight guard is still accepted.
    pub accepted: bool,
}

/// Comment listing query.
#[derive(Debug, Default, Deserialize)]
pub struct CommentsQuery {
    /// Ordering, default `Newest`.
    pub sort: Option<CommentSort>,
    /// Holders filter, default on.
    pub holders_only: Option<bool>,
}

/// Comment listing response.
#[derive(Debug, Serialize)]
pub struct CommentsResponse {
    /// Market the thread belongs to.
    pub key: ReplicaKey,
    /// Ordering applied.
    pub sort: CommentSort,
    /// Whether the holders filter was applied.
    pub holders_only: bool,
    /// Thread size before filtering.
    pub total: usize,
    /// Comments in display order.
    pub comments: Vec<Comment>,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 once the first batch landed, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot();
    let response = ReadyResponse {
        ready: snapshot.is_ready(),
        page: snapshot.page,
    };

    if response.ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns feed progress.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.snapshot();

    let status = match (snapshot.is_ready(), snapshot.has_more) {
        (false, _) => "starting",
        (true, true) => "running",
        (true, false) => "exhausted",
    };

    Json(StatusResponse {
        status,
        feed: FeedStats {
            page: snapshot.page,
            loading: snapshot.loading,
            has_more: snapshot.has_more,
            displayed: snapshot.displayed,
            rendered: snapshot.items.len(),
            catalog_len: state.catalog.len(),
        },
    })
}

/// Feed handler - returns the latest snapshot.
pub async fn feed(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.snapshot())
}

/// Load-more handler - enqueues a load request.
pub async fn load_more(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state
        .control
        .load_more()
        .map_err(|e| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    debug!("Load requested over HTTP");
    Ok((StatusCode::ACCEPTED, Json(LoadMoreResponse { accepted: true })))
}

/// Market detail handler.
pub async fn market(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<MarketDetail>, ApiError> {
    let detail = MarketDetail::lookup_str(&state.catalog, &key)?;
    Ok(Json(detail))
}

/// Comment listing handler.
pub async fn comments(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<CommentsQuery>,
) -> Result<Json<CommentsResponse>, ApiError> {
    let key: ReplicaKey = key.parse()?;
    if state.catalog.lookup(key).is_none() {
        return Err(CatalogError::NotFound {
            key: key.to_string(),
        }
        .into());
    }

    let defaults = CommentView::default();
    let view = CommentView {
        sort: query.sort.unwrap_or(defaults.sort),
        holders_only: query.holders_only.unwrap_or(defaults.holders_only),
    };

    Ok(Json(CommentsResponse {
        key,
        sort: view.sort,
        holders_only: view.holders_only,
        total: state.comments.len(),
        comments: view.apply(&state.comments).into_iter().cloned().collect(),
    }))
}

/// Prometheus scrape handler.
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => ApiError::new(StatusCode::NOT_FOUND, "metrics recorder not installed")
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_errors_map_to_status_codes() {
        let invalid: ApiError = CatalogError::InvalidKey("x".to_string()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

        let missing: ApiError = CatalogError::NotFound {
            key: "0-99".to_string(),
        }
        .into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        let duplicate: ApiError = CatalogError::DuplicateId(3).into();
        assert_eq!(duplicate.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
