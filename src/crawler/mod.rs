//! Crawler module for web page fetching and processing
//!
//! This module contains the crawl-and-index pipeline, including:
//! - HTTP fetching with error classification
//! - Content extraction and link discovery
//! - The per-job URL frontier and per-host politeness
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod job;
mod politeness;

pub use coordinator::Coordinator;
pub use extractor::{
    discover_links, extract, extract_page, truncate_at_word, BodyStrategy, ExtractedPage,
    ExtractorConfig, BODY_STRATEGIES,
};
pub use fetcher::{build_http_client, fetch, FetchedPage};
pub use frontier::{Frontier, FrontierEntry, OfferOutcome};
pub use job::{CancelFlag, CancelOnDrop, CrawlJob, CrawlSummary, JobState, StopReason};
pub use politeness::HostThrottle;

use crate::config::Config;
use crate::index::IndexClient;
use crate::SearchError;
use std::sync::Arc;
use std::time::Duration;

/// Builds a coordinator from the full configuration
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `index` - Where crawled documents are upserted
///
/// # Returns
///
/// * `Ok(Coordinator)` - Ready to run jobs
/// * `Err(SearchError)` - The HTTP client could not be built
pub fn coordinator_from_config(
    config: &Config,
    index: Arc<dyn IndexClient>,
) -> Result<Coordinator, SearchError> {
    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout_secs),
    )?;

    Ok(Coordinator::new(
        config.crawler.clone(),
        config.user_agent.crawler_name.clone(),
        index,
        client,
    ))
}
