//! Crawl job lifecycle types

use crate::url::normalize_url;
use crate::ValidationError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use url::Url;

/// Lifecycle of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Why a completed job stopped before its frontier ran dry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Caller disconnected or the process is shutting down
    Cancelled,
    /// The configured job timeout elapsed
    TimedOut,
    /// The configured page budget was used up
    PageLimit,
}

/// A validated crawl request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJob {
    /// Seed URLs exactly as the caller sent them
    pub urls: Vec<String>,
    /// Normalized seeds, in the same order
    pub seeds: Vec<Url>,
    /// Maximum link hops from a seed
    pub max_depth: u32,
}

impl CrawlJob {
    /// Validates the seed list and builds a job
    ///
    /// # Returns
    ///
    /// * `Err(ValidationError::Missing)` - `urls` is empty
    /// * `Err(ValidationError::InvalidUrl)` - a seed is not an http(s) URL
    pub fn new(urls: Vec<String>, max_depth: u32) -> Result<Self, ValidationError> {
        if urls.is_empty() {
            return Err(ValidationError::Missing("urls"));
        }

        let seeds = urls
            .iter()
            .map(|u| normalize_url(u).map_err(|_| ValidationError::InvalidUrl(u.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            urls,
            seeds,
            max_depth,
        })
    }
}

/// Outcome of a crawl job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub state: JobState,
    /// Documents successfully upserted
    pub documents_indexed: u64,
    /// The caller's seed list
    pub urls: Vec<String>,
    /// Pages for which a fetch was attempted
    pub pages_visited: u64,
    pub fetch_failures: u64,
    /// Fetch failures that were timeouts (included in `fetch_failures`)
    pub fetch_timeouts: u64,
    /// Pages fetched without producing a document, or disallowed by robots.txt
    pub skipped_pages: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CrawlSummary {
    /// An empty summary for a job that has not started
    pub fn pending(job: &CrawlJob) -> Self {
        Self {
            state: JobState::Pending,
            documents_indexed: 0,
            urls: job.urls.clone(),
            pages_visited: 0,
            fetch_failures: 0,
            fetch_timeouts: 0,
            skipped_pages: 0,
            stop_reason: None,
            error: None,
        }
    }
}

/// Shared cancellation signal
///
/// A child flag reports cancelled when it or any ancestor is cancelled, so
/// a server-wide shutdown reaches every job while a job can still be
/// cancelled alone.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    own: Arc<AtomicBool>,
    ancestors: Vec<Arc<AtomicBool>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new flag that is also cancelled whenever `self` is
    pub fn child(&self) -> Self {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Arc::clone(&self.own));
        Self {
            own: Arc::new(AtomicBool::new(false)),
            ancestors,
        }
    }

    pub fn cancel(&self) {
        self.own.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.own.load(Ordering::SeqCst) || self.ancestors.iter().any(|a| a.load(Ordering::SeqCst))
    }
}

/// Cancels the wrapped flag when dropped unless disarmed
///
/// Held by a request handler so that a dropped request future stops its job.
#[derive(Debug)]
pub struct CancelOnDrop {
    flag: Option<CancelFlag>,
}

impl CancelOnDrop {
    pub fn new(flag: CancelFlag) -> Self {
        Self { flag: Some(flag) }
    }

    /// Leaves the flag untouched on drop
    pub fn disarm(mut self) {
        self.flag = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(flag) = self.flag.take() {
            flag.cancel();
        }
    }
}
