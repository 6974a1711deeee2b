//! URL frontier for a single crawl job
//!
//! This module handles:
//! - Depth-bounded queues of discovered URLs
//! - Deduplication on the normalized URL string, while fetching the URL as
//!   it was discovered
//! - Handing out batches from the lowest outstanding depth
//!
//! A frontier lives exactly as long as its job. Workers offer links while the
//! coordinator pulls batches, so all bookkeeping sits behind one mutex and
//! every check-and-insert happens under it.

use crate::url::normalize_url;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use url::Url;

/// A URL paired with the number of link hops from its seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// URL as discovered, without its fragment; this is what gets fetched
    pub url: Url,
    /// Normalized form of `url`, the dedup key
    pub key: Url,
    /// Discovery depth (seeds are 0)
    pub depth: u32,
}

/// What happened to an offered URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Queued for fetching
    Queued,
    /// Already queued or visited in this job
    Duplicate,
    /// Deeper than the job's `max_depth`
    DepthExceeded,
    /// Not a crawlable http(s) URL
    Invalid,
}

#[derive(Debug, Default)]
struct FrontierState {
    /// Pending URLs keyed by depth
    queues: BTreeMap<u32, VecDeque<FrontierEntry>>,
    /// Every key ever queued
    seen: HashSet<String>,
    /// Keys handed out for fetching or reached through a redirect
    visited: HashSet<String>,
}

/// Depth-bounded, deduplicating URL frontier
#[derive(Debug)]
pub struct Frontier {
    max_depth: u32,
    state: Mutex<FrontierState>,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// # Arguments
    ///
    /// * `max_depth` - URLs offered deeper than this are rejected
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            state: Mutex::new(FrontierState::default()),
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        // The state stays consistent even if a holder panicked: every
        // mutation is a single insert or pop.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a candidate URL discovered at `depth`
    ///
    /// A URL that was already queued or visited in this job is never queued
    /// again, whatever depth it is rediscovered at.
    pub fn offer(&self, url: &str, depth: u32) -> OfferOutcome {
        if depth > self.max_depth {
            return OfferOutcome::DepthExceeded;
        }

        let Ok(key) = normalize_url(url) else {
            return OfferOutcome::Invalid;
        };
        // Relative links on the fetched page resolve against this form, so
        // a trailing slash must survive.
        let mut discovered = Url::parse(url.trim()).unwrap_or_else(|_| key.clone());
        discovered.set_fragment(None);

        let mut state = self.lock();
        if state.visited.contains(key.as_str()) || !state.seen.insert(key.as_str().to_string()) {
            return OfferOutcome::Duplicate;
        }
        state.queues.entry(depth).or_default().push_back(FrontierEntry {
            url: discovered,
            key,
            depth,
        });

        OfferOutcome::Queued
    }

    /// Takes up to `n` unvisited URLs from the lowest outstanding depth
    ///
    /// Returned URLs are marked visited before the lock is released, so no
    /// URL is handed out twice.
    pub fn next_batch(&self, n: usize) -> Vec<FrontierEntry> {
        let mut state = self.lock();
        let FrontierState {
            queues, visited, ..
        } = &mut *state;

        let mut batch = Vec::new();
        while let Some(mut lowest) = queues.first_entry() {
            let queue = lowest.get_mut();

            while batch.len() < n {
                let Some(entry) = queue.pop_front() else {
                    break;
                };
                if visited.insert(entry.key.as_str().to_string()) {
                    batch.push(entry);
                }
            }

            if queue.is_empty() {
                lowest.remove();
            }
            if !batch.is_empty() || n == 0 {
                break;
            }
        }

        batch
    }

    /// Records a URL as visited; returns `true` the first time
    pub fn mark_visited(&self, url: &Url) -> bool {
        let key = normalize_url(url.as_str())
            .map(|u| u.as_str().to_string())
            .unwrap_or_else(|_| url.as_str().to_string());
        self.lock().visited.insert(key)
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        normalize_url(url.as_str())
            .map(|u| self.lock().visited.contains(u.as_str()))
            .unwrap_or(false)
    }

    /// Number of distinct URLs ever queued
    pub fn offered_count(&self) -> usize {
        self.lock().seen.len()
    }

    /// Number of distinct URLs visited
    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    /// Number of URLs still waiting to be handed out
    pub fn pending_count(&self) -> usize {
        self.lock().queues.values().map(VecDeque::len).sum()
    }

    /// No URL within the depth bound is left to fetch
    pub fn is_exhausted(&self) -> bool {
        self.pending_count() == 0
    }
}
