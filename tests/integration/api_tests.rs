//! Integration tests for the HTTP API
//!
//! Requests are sent straight to the router with `tower::ServiceExt`; crawl
//! targets are wiremock servers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sumi_search::config::{CrawlerConfig, UserAgentConfig};
use sumi_search::crawler::{build_http_client, Coordinator};
use sumi_search::index::{Document, IndexClient, SqliteIndex};
use sumi_search::server::{create_router, AppState};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_app() -> (Router, Arc<SqliteIndex>) {
    let index = Arc::new(SqliteIndex::new_in_memory().expect("Failed to open index"));
    let config = CrawlerConfig {
        max_concurrent: 4,
        request_timeout_secs: 5,
        ..CrawlerConfig::default()
    };
    let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(5))
        .expect("Failed to build HTTP client");
    let coordinator = Coordinator::new(config, "SumiSearch", index.clone(), client);
    let state = AppState::new(index.clone(), coordinator);
    (create_router(state), index)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn seed(index: &SqliteIndex, url: &str, title: &str, content: &str, day: u32) {
    let doc = Document::with_timestamp(
        url,
        title.to_string(),
        None,
        None,
        content.to_string(),
        Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
    );
    index.upsert(&doc).unwrap();
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let (status, body) = send(app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_search_rejects_large_offset() {
    let (app, _) = test_app();
    let (status, body) = send(
        app,
        Method::GET,
        "/api/search?q=&limit=10&offset=10000001",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("offset"));
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_search_rejects_zero_limit() {
    let (app, _) = test_app();
    let (status, body) = send(app, Method::GET, "/api/search?q=rust&limit=0", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_search_returns_ranked_page() {
    let (app, index) = test_app();
    seed(&index, "https://a.example/", "Rust guide", "Learning rust step by step with examples.", 1);
    seed(&index, "https://b.example/", "Cooking", "Recipes for bread and soup and more.", 2);
    seed(&index, "https://c.example/", "Notes", "Some notes that mention rust once.", 3);

    let (status, body) = send(app, Method::GET, "/api/search?q=rust&limit=1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let data = &body["data"];
    assert_eq!(data["query"], "rust");
    assert_eq!(data["total_hits"], 2);
    assert_eq!(data["hits"].as_array().unwrap().len(), 1);
    assert_eq!(data["hits"][0]["title"], "Rust guide");
    assert!(data["processing_time_ms"].is_u64());
}

#[tokio::test]
async fn test_search_filters_by_date() {
    let (app, index) = test_app();
    seed(&index, "https://a.example/", "First", "An early page about gardening tools.", 1);
    seed(&index, "https://b.example/", "Second", "A later page about gardening tools.", 20);

    let (status, body) = send(
        app,
        Method::GET,
        "/api/search?from_date=2024-05-10&sort_by=crawled_at&sort_order=desc",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_hits"], 1);
    assert_eq!(body["data"]["hits"][0]["title"], "Second");
}

#[tokio::test]
async fn test_search_rejects_bad_date() {
    let (app, _) = test_app();
    let (status, body) = send(app, Method::GET, "/api/search?to_date=soon", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("to_date"));
}

#[tokio::test]
async fn test_stats_after_clear() {
    let (app, index) = test_app();
    seed(&index, "https://a.example/", "One", "Content for the first document here.", 1);

    let (status, body) = send(app.clone(), Method::GET, "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["numberOfDocuments"], 1);
    assert_eq!(body["data"]["isIndexing"], false);
    assert_eq!(body["data"]["fieldDistribution"]["title"], 1);

    let (status, body) = send(app.clone(), Method::DELETE, "/api/index", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Index cleared successfully");

    let (_, body) = send(app.clone(), Method::GET, "/api/stats", None).await;
    assert_eq!(body["data"]["numberOfDocuments"], 0);

    let (_, body) = send(app, Method::GET, "/api/search?q=first", None).await;
    assert_eq!(body["data"]["total_hits"], 0);
}

#[tokio::test]
async fn test_crawl_rejects_invalid_url() {
    let (app, _) = test_app();
    let (status, body) = send(
        app,
        Method::POST,
        "/api/crawl",
        Some(json!({"urls": ["not a url"], "max_depth": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Crawl failed: invalid URL");
}

#[tokio::test]
async fn test_crawl_requires_urls() {
    let (app, _) = test_app();

    let (status, body) = send(app.clone(), Method::POST, "/api/crawl", Some(json!({"urls": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("urls"));

    let (status, _) = send(app, Method::POST, "/api/crawl", Some(json!({"max_depth": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_crawl_rejects_depth_out_of_range() {
    let (app, _) = test_app();

    for depth in [-1, 11] {
        let (status, body) = send(
            app.clone(),
            Method::POST,
            "/api/crawl",
            Some(json!({"urls": ["https://example.com"], "max_depth": depth})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("max_depth"));
    }
}

#[tokio::test]
async fn test_crawl_then_search() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "<html><head><title>Example Domain</title></head><body>\
                 <div><h1>Example Domain</h1>\
                 <p>This domain is for use in illustrative examples in documents. \
                 You may use it without prior coordination.</p></div></body></html>",
                "text/html",
            ),
        )
        .mount(&mock_server)
        .await;

    let (app, _) = test_app();
    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/api/crawl",
        Some(json!({"urls": [mock_server.uri()], "max_depth": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["message"], "Crawling completed");
    assert_eq!(body["data"]["documents_indexed"], 1);
    assert_eq!(body["data"]["urls"], json!([mock_server.uri()]));

    let (status, body) = send(app, Method::GET, "/api/search?q=illustrative", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_hits"], 1);
    assert_eq!(body["data"]["hits"][0]["word_count"], 19);
}
