//! HTTP API Request/Response Types
//!
//! JSON-serializable types for the HTTP API.

use crate::crawler::{CrawlSummary, StopReason};
use crate::index::IndexStats;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response envelope shared by every `/api` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with `{success: true, data}`
    pub fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

/// `{success: false, error}` with the given status
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

/// Health check body
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/// Crawl request body
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlRequest {
    /// Seed URLs (required, non-empty)
    #[serde(default)]
    pub urls: Vec<String>,
    /// Link hops to follow; the configured default when absent
    pub max_depth: Option<i64>,
}

/// Crawl result
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResponse {
    pub message: String,
    pub documents_indexed: u64,
    pub urls: Vec<String>,
    pub pages_visited: u64,
    pub fetch_failures: u64,
    pub skipped_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

impl From<CrawlSummary> for CrawlResponse {
    fn from(summary: CrawlSummary) -> Self {
        let message = match summary.stop_reason {
            None => "Crawling completed".to_string(),
            Some(StopReason::Cancelled) => "Crawling cancelled".to_string(),
            Some(StopReason::TimedOut) => "Crawling stopped at the time limit".to_string(),
            Some(StopReason::PageLimit) => "Crawling stopped at the page limit".to_string(),
        };

        Self {
            message,
            documents_indexed: summary.documents_indexed,
            urls: summary.urls,
            pages_visited: summary.pages_visited,
            fetch_failures: summary.fetch_failures,
            skipped_pages: summary.skipped_pages,
            stop_reason: summary.stop_reason,
        }
    }
}

/// Index statistics in the engine's camelCase shape
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub number_of_documents: u64,
    pub is_indexing: bool,
    pub field_distribution: BTreeMap<String, u64>,
}

impl From<IndexStats> for StatsResponse {
    fn from(stats: IndexStats) -> Self {
        Self {
            number_of_documents: stats.document_count,
            is_indexing: stats.is_indexing,
            field_distribution: stats.field_distribution,
        }
    }
}

/// Plain confirmation message
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_are_camel_case() {
        let stats = IndexStats {
            document_count: 2,
            is_indexing: false,
            field_distribution: BTreeMap::from([("title".to_string(), 2)]),
        };
        let json = serde_json::to_value(StatsResponse::from(stats)).unwrap();
        assert_eq!(json["numberOfDocuments"], 2);
        assert_eq!(json["isIndexing"], false);
        assert_eq!(json["fieldDistribution"]["title"], 2);
    }

    #[test]
    fn test_error_envelope_omits_data() {
        let envelope = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some("boom".to_string()),
        };
        let json = serde_json::to_value(envelope).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }
}
