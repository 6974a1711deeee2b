//! Sumi-Search: crawl, extract and search
//!
//! This crate crawls a seed set of URLs, turns each page into a cleaned
//! [`Document`](index::Document), streams the documents into a durable
//! full-text index and serves ranked, filterable search over it.

pub mod config;
pub mod crawler;
pub mod index;
pub mod robots;
pub mod search;
pub mod server;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Search operations
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Errors raised while retrieving a single page
///
/// A fetch error never aborts a crawl job: the coordinator counts it and
/// moves on to the remaining frontier entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpError(u16),

    #[error("non-text content: {0}")]
    NonTextContent(String),
}

/// Errors reported by the index engine
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt index entry: {0}")]
    Corrupt(String),
}

/// Bad caller input, surfaced as HTTP 400 and never retried
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required parameter '{0}'")]
    Missing(&'static str),

    #[error("parameter '{name}' is out of range: {message}")]
    OutOfRange { name: &'static str, message: String },

    #[error("parameter '{name}' has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },

    #[error("parameter '{name}' is not an ISO-8601 timestamp: '{value}'")]
    InvalidDate { name: &'static str, value: String },

    #[error("invalid URL")]
    InvalidUrl(String),
}

/// Result type alias for Sumi-Search operations
pub type Result<T> = std::result::Result<T, SearchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CancelFlag, Coordinator, CrawlJob, CrawlSummary, JobState};
pub use index::{Document, IndexClient, SqliteIndex};
pub use search::{QueryPlanner, SearchParams, SearchResponse};
pub use url::{extract_domain, normalize_url};
