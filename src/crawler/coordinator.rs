//! Crawler coordinator - main crawl orchestration logic
//!
//! This module runs one crawl job end to end:
//! - Seeding a fresh frontier for the job
//! - Dispatching batches of fetches under the concurrency cap
//! - Extracting documents and feeding discovered links back
//! - Streaming documents to the index as they are produced
//! - Honoring cancellation, the job timeout and the page budget

use crate::config::CrawlerConfig;
use crate::crawler::extractor::{extract_page, ExtractorConfig};
use crate::crawler::fetcher::fetch;
use crate::crawler::frontier::{Frontier, FrontierEntry, OfferOutcome};
use crate::crawler::job::{CancelFlag, CrawlJob, CrawlSummary, JobState, StopReason};
use crate::crawler::politeness::HostThrottle;
use crate::index::{Document, IndexClient};
use crate::robots::RobotsCache;
use crate::url::{extract_domain, normalize_url, LinkScope, ScopeDecision};
use crate::FetchError;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// What a worker did with one frontier entry
#[derive(Debug)]
enum PageOutcome {
    /// A document was produced and handed to the indexer
    Extracted,
    /// Fetched, but too little content for a document
    NoContent,
    /// Skipped because robots.txt disallows it
    Disallowed,
    /// Redirected to a page this job has already visited
    AlreadyVisited,
    /// The fetch failed
    Failed(FetchError),
}

/// State shared by the workers of one job
struct JobContext {
    client: Client,
    frontier: Frontier,
    scope: LinkScope,
    throttle: HostThrottle,
    robots: Option<RobotsCache>,
    extractor: ExtractorConfig,
    documents: mpsc::Sender<Document>,
}

/// Result of the indexing side of a job
#[derive(Debug, Default)]
struct IndexerOutcome {
    indexed: u64,
    error: Option<String>,
}

/// Main crawler coordinator structure
///
/// A coordinator holds only what jobs share: configuration, the index and the
/// HTTP client. Every call to [`Coordinator::run`] builds its own frontier,
/// so concurrent jobs never see each other's visited sets.
#[derive(Clone)]
pub struct Coordinator {
    config: CrawlerConfig,
    robots_agent: String,
    index: Arc<dyn IndexClient>,
    client: Client,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `robots_agent` - Product token matched against robots.txt groups
    /// * `index` - Where documents are upserted
    /// * `client` - HTTP client used for pages and robots.txt
    pub fn new(
        config: CrawlerConfig,
        robots_agent: impl Into<String>,
        index: Arc<dyn IndexClient>,
        client: Client,
    ) -> Self {
        Self {
            config,
            robots_agent: robots_agent.into(),
            index,
            client,
        }
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Runs a crawl job to completion
    ///
    /// Per-page failures are counted and never fail the job. An index
    /// failure stops dispatching and reports `Failed` with the number of
    /// documents indexed before it. Documents already indexed stay indexed
    /// whatever the outcome.
    pub async fn run(&self, job: CrawlJob, cancel: CancelFlag) -> CrawlSummary {
        let mut summary = CrawlSummary::pending(&job);
        summary.state = JobState::Running;
        let started = Instant::now();

        tracing::info!(
            "Starting crawl of {} seed(s) with max depth {}",
            job.seeds.len(),
            job.max_depth
        );

        let (tx, rx) = mpsc::channel(self.batch_size() * 2);
        let index_failed = Arc::new(AtomicBool::new(false));
        let indexer = tokio::spawn(run_indexer(
            Arc::clone(&self.index),
            rx,
            Arc::clone(&index_failed),
        ));

        let ctx = Arc::new(self.job_context(&job, tx));
        for (raw, seed) in job.urls.iter().zip(&job.seeds) {
            if ctx.scope.decide(seed) == ScopeDecision::Blocked {
                tracing::warn!("Seed {} is on a blocked domain, skipping", seed);
                continue;
            }
            ctx.frontier.offer(raw, 0);
        }

        let deadline = self
            .config
            .job_timeout_secs
            .map(|secs| started + Duration::from_secs(secs));
        let page_budget = self.config.max_pages_per_job.map(|n| n as u64);
        let mut dispatched = 0u64;

        loop {
            if cancel.is_cancelled() {
                tracing::info!("Crawl cancelled, no further batches will be dispatched");
                summary.stop_reason = Some(StopReason::Cancelled);
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::info!("Crawl reached its time limit");
                summary.stop_reason = Some(StopReason::TimedOut);
                break;
            }
            if index_failed.load(Ordering::SeqCst) {
                break;
            }

            let mut batch_size = self.batch_size();
            if let Some(budget) = page_budget {
                let remaining = budget.saturating_sub(dispatched);
                if remaining == 0 {
                    if !ctx.frontier.is_exhausted() {
                        tracing::info!("Crawl reached its page budget of {}", budget);
                        summary.stop_reason = Some(StopReason::PageLimit);
                    }
                    break;
                }
                batch_size = batch_size.min(remaining as usize);
            }

            let batch = ctx.frontier.next_batch(batch_size);
            if batch.is_empty() {
                tracing::debug!("Frontier exhausted");
                break;
            }
            dispatched += batch.len() as u64;

            let mut workers = JoinSet::new();
            for entry in batch {
                workers.spawn(process_entry(Arc::clone(&ctx), entry));
            }

            let mut timed_out = false;
            loop {
                let joined = match deadline {
                    Some(d) if !timed_out => {
                        match tokio::time::timeout_at(d, workers.join_next()).await {
                            Ok(joined) => joined,
                            Err(_) => {
                                tracing::info!(
                                    "Crawl reached its time limit with {} fetches in flight",
                                    workers.len()
                                );
                                timed_out = true;
                                workers.abort_all();
                                continue;
                            }
                        }
                    }
                    _ => workers.join_next().await,
                };
                let Some(joined) = joined else { break };
                match joined {
                    Ok(PageOutcome::Extracted) => summary.pages_visited += 1,
                    Ok(PageOutcome::NoContent) => {
                        summary.pages_visited += 1;
                        summary.skipped_pages += 1;
                    }
                    Ok(PageOutcome::Disallowed) => summary.skipped_pages += 1,
                    Ok(PageOutcome::AlreadyVisited) => {
                        summary.pages_visited += 1;
                        summary.skipped_pages += 1;
                    }
                    Ok(PageOutcome::Failed(error)) => {
                        summary.pages_visited += 1;
                        summary.fetch_failures += 1;
                        if error == FetchError::Timeout {
                            summary.fetch_timeouts += 1;
                        }
                    }
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => {
                        tracing::error!("Crawl worker failed: {}", e);
                        summary.pages_visited += 1;
                        summary.fetch_failures += 1;
                    }
                }
            }

            if timed_out {
                summary.stop_reason = Some(StopReason::TimedOut);
                break;
            }

            tracing::info!(
                "Progress: {} pages visited, {} pending, {:.1}s elapsed",
                summary.pages_visited,
                ctx.frontier.pending_count(),
                started.elapsed().as_secs_f64()
            );
        }

        // Closing the last sender lets the indexer drain and finish.
        drop(ctx);
        let outcome = match indexer.await {
            Ok(outcome) => outcome,
            Err(e) => IndexerOutcome {
                indexed: 0,
                error: Some(format!("indexer task failed: {}", e)),
            },
        };

        summary.documents_indexed = outcome.indexed;
        match outcome.error {
            Some(error) => {
                tracing::error!(
                    "Crawl failed after indexing {} document(s): {}",
                    outcome.indexed,
                    error
                );
                summary.state = JobState::Failed;
                summary.error = Some(error);
            }
            None => {
                summary.state = JobState::Completed;
                tracing::info!(
                    "Crawl completed: {} document(s) indexed, {} pages visited, {} failures in {:?}",
                    summary.documents_indexed,
                    summary.pages_visited,
                    summary.fetch_failures,
                    started.elapsed()
                );
            }
        }

        summary
    }

    fn batch_size(&self) -> usize {
        self.config.max_concurrent.max(1) as usize
    }

    fn job_context(&self, job: &CrawlJob, documents: mpsc::Sender<Document>) -> JobContext {
        let robots = self
            .config
            .respect_robots_txt
            .then(|| RobotsCache::new(self.client.clone(), self.robots_agent.clone()));

        JobContext {
            client: self.client.clone(),
            frontier: Frontier::new(job.max_depth),
            scope: LinkScope::new(&job.seeds, &self.config),
            throttle: HostThrottle::new(Duration::from_millis(self.config.politeness_delay_ms)),
            robots,
            extractor: ExtractorConfig::from(&self.config),
            documents,
        }
    }
}

/// Fetches, extracts and links one frontier entry
async fn process_entry(ctx: Arc<JobContext>, entry: FrontierEntry) -> PageOutcome {
    let url = &entry.url;

    if let Some(robots) = &ctx.robots {
        if !robots.is_allowed(url).await {
            tracing::info!("URL {} disallowed by robots.txt", url);
            return PageOutcome::Disallowed;
        }
    }

    if let Some(host) = extract_domain(url) {
        ctx.throttle.wait(&host).await;
    }

    tracing::debug!("Fetching {} (depth {})", url, entry.depth);
    let page = match fetch(&ctx.client, url.as_str()).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}", url, e);
            return PageOutcome::Failed(e);
        }
    };

    let page_key = normalize_url(page.final_url.as_str()).unwrap_or_else(|_| entry.key.clone());
    if page_key != entry.key {
        tracing::debug!("{} redirected to {}", url, page.final_url);
        if !ctx.frontier.mark_visited(&page_key) {
            tracing::debug!("{} was already visited in this job", page_key);
            return PageOutcome::AlreadyVisited;
        }
    }

    let extracted = extract_page(&page.body, &page.final_url, &ctx.extractor);

    let next_depth = entry.depth + 1;
    if next_depth <= ctx.frontier.max_depth() {
        let mut queued = 0usize;
        for link in &extracted.links {
            if ctx.scope.decide(link) != ScopeDecision::Follow {
                continue;
            }
            if ctx.frontier.offer(link.as_str(), next_depth) == OfferOutcome::Queued {
                queued += 1;
            }
        }
        tracing::debug!("{}: {} new link(s) queued", page_key, queued);
    }

    match extracted.document {
        Some(document) => {
            if ctx.documents.send(document).await.is_err() {
                // The indexer has stopped after a failure; the job is ending.
                return PageOutcome::NoContent;
            }
            PageOutcome::Extracted
        }
        None => {
            tracing::debug!("{}: not enough content, skipping", page_key);
            PageOutcome::NoContent
        }
    }
}

/// Upserts documents in the order they arrive
///
/// Stops at the first index error, raising `failed` so the coordinator
/// dispatches nothing further.
async fn run_indexer(
    index: Arc<dyn IndexClient>,
    mut documents: mpsc::Receiver<Document>,
    failed: Arc<AtomicBool>,
) -> IndexerOutcome {
    let mut outcome = IndexerOutcome::default();

    while let Some(document) = documents.recv().await {
        let index = Arc::clone(&index);
        let url = document.url.clone();
        let result = tokio::task::spawn_blocking(move || index.upsert(&document)).await;

        let error = match result {
            Ok(Ok(())) => {
                outcome.indexed += 1;
                tracing::debug!("Indexed {}", url);
                continue;
            }
            Ok(Err(e)) => e.to_string(),
            Err(e) => format!("index task failed: {}", e),
        };

        failed.store(true, Ordering::SeqCst);
        outcome.error = Some(error);
        break;
    }

    outcome
}
