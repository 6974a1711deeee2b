//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run whole crawl
//! jobs against a real index.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sumi_search::config::{CrawlerConfig, UserAgentConfig};
use sumi_search::crawler::{build_http_client, CancelFlag, Coordinator, CrawlJob, JobState};
use sumi_search::index::{
    Document, EngineQuery, EngineResult, Filters, IndexClient, IndexSettings, IndexStats,
    SqliteIndex,
};
use sumi_search::IndexError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FILLER: &str = "This page has more than enough words in it to pass the minimum content length check.";

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ),
        "text/html; charset=utf-8",
    )
}

fn create_test_config() -> CrawlerConfig {
    CrawlerConfig {
        max_concurrent: 4,
        request_timeout_secs: 5,
        ..CrawlerConfig::default()
    }
}

fn coordinator(config: CrawlerConfig, index: Arc<dyn IndexClient>) -> Coordinator {
    let user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    let client = build_http_client(&user_agent, Duration::from_secs(config.request_timeout_secs))
        .expect("Failed to build HTTP client");
    Coordinator::new(config, user_agent.crawler_name.clone(), index, client)
}

fn match_all(limit: usize) -> EngineQuery {
    EngineQuery {
        q: String::new(),
        filters: Filters::default(),
        sort: None,
        limit,
        offset: 0,
    }
}

/// Index that accepts a fixed number of documents and then fails
struct FailingIndex {
    settings: IndexSettings,
    accept: usize,
    upserts: AtomicUsize,
}

impl FailingIndex {
    fn new(accept: usize) -> Self {
        Self {
            settings: IndexSettings::default(),
            accept,
            upserts: AtomicUsize::new(0),
        }
    }
}

impl IndexClient for FailingIndex {
    fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    fn upsert(&self, _document: &Document) -> Result<(), IndexError> {
        if self.upserts.fetch_add(1, Ordering::SeqCst) < self.accept {
            Ok(())
        } else {
            Err(IndexError::Unavailable("disk full".to_string()))
        }
    }

    fn clear_all(&self) -> Result<(), IndexError> {
        Ok(())
    }

    fn stats(&self) -> Result<IndexStats, IndexError> {
        Err(IndexError::Unavailable("disk full".to_string()))
    }

    fn search(&self, _query: &EngineQuery) -> Result<EngineResult, IndexError> {
        Err(IndexError::Unavailable("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_example_domain_is_indexed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Example Domain",
            "<div><h1>Example Domain</h1>\
             <p>This domain is for use in illustrative examples in documents. \
             You may use it without prior coordination.</p></div>",
        ))
        .mount(&mock_server)
        .await;

    let index = Arc::new(SqliteIndex::new_in_memory().unwrap());
    let job = CrawlJob::new(vec![mock_server.uri()], 1).unwrap();
    let summary = coordinator(create_test_config(), index.clone())
        .run(job, CancelFlag::new())
        .await;

    assert_eq!(summary.state, JobState::Completed);
    assert_eq!(summary.documents_indexed, 1);
    assert_eq!(summary.urls, vec![mock_server.uri()]);

    let result = index.search(&match_all(10)).unwrap();
    assert_eq!(result.total_hits, 1);
    let doc = &result.hits[0];
    assert_eq!(doc.title, "Example Domain");
    assert_eq!(doc.word_count, 19);
    assert_eq!(doc.url, format!("{}/", mock_server.uri()));
}

#[tokio::test]
async fn test_pages_linking_to_each_other_are_fetched_once() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            &format!(
                "<p>{}</p><a href=\"{base}/a\">A</a> <a href=\"/b\">B</a> <a href=\"{base}/#top\">Top</a>",
                FILLER
            ),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page(
            "A",
            &format!("<p>{}</p><a href=\"/b\">B</a> <a href=\"/\">Home</a>", FILLER),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page(
            "B",
            &format!("<p>{}</p><a href=\"/a\">A</a> <a href=\"/\">Home</a>", FILLER),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let index = Arc::new(SqliteIndex::new_in_memory().unwrap());
    let job = CrawlJob::new(vec![base.clone()], 5).unwrap();
    let summary = coordinator(create_test_config(), index.clone())
        .run(job, CancelFlag::new())
        .await;

    assert_eq!(summary.state, JobState::Completed);
    assert_eq!(summary.pages_visited, 3);
    assert_eq!(summary.documents_indexed, 3);
    assert_eq!(index.stats().unwrap().document_count, 3);
}

#[tokio::test]
async fn test_depth_bound_is_respected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Root",
            &format!("<p>{}</p><a href=\"/level1\">next</a>", FILLER),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/level1"))
        .respond_with(html_page(
            "Level 1",
            &format!("<p>{}</p><a href=\"/level2\">next</a>", FILLER),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/level2"))
        .respond_with(html_page("Level 2", FILLER))
        .expect(0)
        .mount(&mock_server)
        .await;

    let index = Arc::new(SqliteIndex::new_in_memory().unwrap());
    let job = CrawlJob::new(vec![mock_server.uri()], 1).unwrap();
    let summary = coordinator(create_test_config(), index.clone())
        .run(job, CancelFlag::new())
        .await;

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.documents_indexed, 2);
}

#[tokio::test]
async fn test_depth_zero_fetches_only_seeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Root",
            &format!("<p>{}</p><a href=\"/child\">child</a>", FILLER),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/child"))
        .respond_with(html_page("Child", FILLER))
        .expect(0)
        .mount(&mock_server)
        .await;

    let index = Arc::new(SqliteIndex::new_in_memory().unwrap());
    let job = CrawlJob::new(vec![mock_server.uri()], 0).unwrap();
    let summary = coordinator(create_test_config(), index)
        .run(job, CancelFlag::new())
        .await;

    assert_eq!(summary.pages_visited, 1);
}

#[tokio::test]
async fn test_fetch_failures_do_not_fail_the_job() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Root",
            &format!(
                "<p>{}</p><a href=\"/missing\">gone</a> <a href=\"/broken\">broken</a> \
                 <a href=\"/report.pdf\">pdf</a> <a href=\"/ok\">ok</a>",
                FILLER
            ),
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html_page("Ok", FILLER))
        .mount(&mock_server)
        .await;

    let index = Arc::new(SqliteIndex::new_in_memory().unwrap());
    let job = CrawlJob::new(vec![mock_server.uri()], 1).unwrap();
    let summary = coordinator(create_test_config(), index.clone())
        .run(job, CancelFlag::new())
        .await;

    assert_eq!(summary.state, JobState::Completed);
    assert_eq!(summary.pages_visited, 5);
    assert_eq!(summary.fetch_failures, 3);
    assert_eq!(summary.documents_indexed, 2);
    assert!(summary.documents_indexed <= summary.pages_visited);
}

#[tokio::test]
async fn test_unreachable_seed_completes_with_nothing_indexed() {
    let index = Arc::new(SqliteIndex::new_in_memory().unwrap());
    // Port 9 (discard) is not expected to accept HTTP connections
    let job = CrawlJob::new(vec!["http://127.0.0.1:9/".to_string()], 1).unwrap();
    let summary = coordinator(create_test_config(), index)
        .run(job, CancelFlag::new())
        .await;

    assert_eq!(summary.state, JobState::Completed);
    assert_eq!(summary.documents_indexed, 0);
    assert_eq!(summary.fetch_failures, 1);
}

#[tokio::test]
async fn test_index_failure_aborts_job() {
    let mock_server = MockServer::start().await;
    let links: String = (0..10)
        .map(|i| format!("<a href=\"/p{}\">p{}</a> ", i, i))
        .collect();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Root", &format!("<p>{}</p>{}", FILLER, links)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(html_page("Child", FILLER))
        .mount(&mock_server)
        .await;

    let index = Arc::new(FailingIndex::new(2));
    let job = CrawlJob::new(vec![mock_server.uri()], 1).unwrap();
    let config = CrawlerConfig {
        max_concurrent: 1,
        ..create_test_config()
    };
    let summary = coordinator(config, index).run(job, CancelFlag::new()).await;

    assert_eq!(summary.state, JobState::Failed);
    assert_eq!(summary.documents_indexed, 2);
    assert!(summary.error.as_deref().unwrap().contains("disk full"));
    assert!(summary.pages_visited < 11);
}

#[tokio::test]
async fn test_blocked_domains_are_not_fetched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_page("Blocked", FILLER))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = CrawlerConfig {
        blocked_domains: vec!["127.0.0.1".to_string()],
        ..create_test_config()
    };
    let index = Arc::new(SqliteIndex::new_in_memory().unwrap());
    let job = CrawlJob::new(vec![mock_server.uri()], 1).unwrap();
    let summary = coordinator(config, index).run(job, CancelFlag::new()).await;

    assert_eq!(summary.state, JobState::Completed);
    assert_eq!(summary.pages_visited, 0);
}

#[tokio::test]
async fn test_recrawl_replaces_documents() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", FILLER))
        .mount(&mock_server)
        .await;

    let index = Arc::new(SqliteIndex::new_in_memory().unwrap());
    let coordinator = coordinator(create_test_config(), index.clone());

    for _ in 0..2 {
        let job = CrawlJob::new(vec![mock_server.uri()], 0).unwrap();
        let summary = coordinator.run(job, CancelFlag::new()).await;
        assert_eq!(summary.documents_indexed, 1);
    }

    assert_eq!(index.stats().unwrap().document_count, 1);
}
