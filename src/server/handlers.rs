//! HTTP API Request Handlers
//!
//! Handlers map HTTP requests onto the crawl coordinator, the query planner
//! and the index. Index calls are synchronous and run on the blocking pool.

use crate::crawler::{CancelFlag, CancelOnDrop, Coordinator, CrawlJob, JobState};
use crate::index::IndexClient;
use crate::search::{QueryPlanner, SearchParams};
use crate::{IndexError, ValidationError};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::types::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<dyn IndexClient>,
    pub coordinator: Coordinator,
    pub planner: QueryPlanner,
    /// Parent of every job's cancel flag; set on shutdown
    pub shutdown: CancelFlag,
}

impl AppState {
    pub fn new(index: Arc<dyn IndexClient>, coordinator: Coordinator) -> Self {
        Self {
            index,
            coordinator,
            planner: QueryPlanner::new(),
            shutdown: CancelFlag::new(),
        }
    }
}

/// Runs an index call on the blocking pool
async fn with_index<T, F>(state: &AppState, f: F) -> Result<T, IndexError>
where
    T: Send + 'static,
    F: FnOnce(&dyn IndexClient) -> Result<T, IndexError> + Send + 'static,
{
    let index = Arc::clone(&state.index);
    tokio::task::spawn_blocking(move || f(index.as_ref()))
        .await
        .map_err(|e| IndexError::Unavailable(format!("index task failed: {}", e)))?
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Crawl endpoint
///
/// Runs the job to completion before responding. The job runs in its own
/// task; if the caller goes away the request future is dropped and the job
/// is cancelled.
pub async fn crawl(
    State(state): State<AppState>,
    payload: Result<Json<CrawlRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {}", rejection.body_text()),
            )
        }
    };

    let config = state.coordinator.config();
    let max_depth = match request.max_depth {
        None => config.max_depth,
        Some(depth) if depth < 0 || depth > i64::from(config.max_depth_limit) => {
            let err = ValidationError::OutOfRange {
                name: "max_depth",
                message: format!("must be between 0 and {}", config.max_depth_limit),
            };
            return error_response(StatusCode::BAD_REQUEST, err.to_string());
        }
        Some(depth) => depth as u32,
    };

    let job = match CrawlJob::new(request.urls, max_depth) {
        Ok(job) => job,
        Err(e @ ValidationError::InvalidUrl(_)) => {
            debug!("Rejected crawl request: {:?}", e);
            return error_response(StatusCode::BAD_REQUEST, format!("Crawl failed: {}", e));
        }
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    info!("Crawl requested for {:?} (max depth {})", job.urls, job.max_depth);

    let cancel = state.shutdown.child();
    let guard = CancelOnDrop::new(cancel.clone());
    let coordinator = state.coordinator.clone();
    let handle = tokio::spawn(async move { coordinator.run(job, cancel).await });

    let summary = match handle.await {
        Ok(summary) => summary,
        Err(e) => {
            error!("Crawl task failed: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    guard.disarm();

    if summary.state == JobState::Failed {
        let reason = summary.error.as_deref().unwrap_or("unknown error");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Crawl failed: {}", reason),
        );
    }

    ApiResponse::ok(CrawlResponse::from(summary))
}

/// Search endpoint
pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let query = match state.planner.plan(&params) {
        Ok(query) => query,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    debug!("Search: {:?}", query);
    let q = query.q.clone();

    match with_index(&state, move |index| index.search(&query)).await {
        Ok(result) => ApiResponse::ok(state.planner.render(result, q)),
        Err(e) => {
            error!("Search failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Search failed: {}", e),
            )
        }
    }
}

/// Stats endpoint
pub async fn stats(State(state): State<AppState>) -> Response {
    match with_index(&state, |index| index.stats()).await {
        Ok(stats) => ApiResponse::ok(StatsResponse::from(stats)),
        Err(e) => {
            error!("Failed to read index stats: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to get stats: {}", e),
            )
        }
    }
}

/// Clear index endpoint
pub async fn clear_index(State(state): State<AppState>) -> Response {
    match with_index(&state, |index| index.clear_all()).await {
        Ok(()) => {
            info!("Index cleared");
            ApiResponse::ok(MessageResponse {
                message: "Index cleared successfully".to_string(),
            })
        }
        Err(e) => {
            error!("Failed to clear index: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to clear index: {}", e),
            )
        }
    }
}

/// Converts a handler panic into the generic 500 envelope
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}
