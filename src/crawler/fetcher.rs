//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a bounded per-request timeout
//! - Error classification into [`FetchError`] kinds

use crate::config::UserAgentConfig;
use crate::FetchError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Redirect hops followed before a fetch is reported as a network error
const MAX_REDIRECTS: usize = 10;

/// Content types treated as HTML
const HTML_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// A successfully retrieved HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value, if the server sent one
    pub content_type: Option<String>,
    /// Decoded page body
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total time allowed for one request, body included
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_search::config::UserAgentConfig;
/// use sumi_search::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiSearch".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies any failure
///
/// | Condition | Result |
/// |-----------|--------|
/// | Unparseable or non-http(s) URL | `InvalidUrl` |
/// | Client timeout | `Timeout` |
/// | DNS / connect / redirect failure | `NetworkError` |
/// | Non-2xx status | `HttpError(status)` |
/// | Content-Type not HTML | `NonTextContent` |
///
/// A response without a Content-Type header is treated as HTML.
pub async fn fetch(client: &Client, url: &str) -> Result<FetchedPage, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl(url.to_string()));
    }

    let response = client.get(parsed).send().await.map_err(classify)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpError(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    if let Some(ct) = content_type.as_deref() {
        if !is_html(ct) {
            return Err(FetchError::NonTextContent(ct.to_string()));
        }
    }

    let final_url = response.url().clone();
    let body = response.text().await.map_err(classify)?;

    Ok(FetchedPage {
        final_url,
        status: status.as_u16(),
        content_type,
        body,
    })
}

/// Checks the media type part of a Content-Type header
fn is_html(content_type: &str) -> bool {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    HTML_CONTENT_TYPES.contains(&media_type.as_str())
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_builder() {
        FetchError::InvalidUrl(error.to_string())
    } else if error.is_connect() {
        FetchError::NetworkError(format!("connection failed: {}", error))
    } else if error.is_redirect() {
        FetchError::NetworkError(format!("redirect failed: {}", error))
    } else {
        FetchError::NetworkError(error.to_string())
    }
}
