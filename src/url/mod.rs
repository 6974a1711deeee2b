//! URL handling module for Sumi-Search
//!
//! Normalization produces the frontier's dedup key; [`LinkScope`] decides
//! which discovered links a job is allowed to follow.

mod normalize;

use crate::config::CrawlerConfig;
use std::collections::HashSet;
use url::Url;

pub use normalize::normalize_url;

/// Extracts the lowercase host of a URL, or `None` for host-less URLs
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks if a domain matches a pattern
///
/// `"example.com"` matches only itself; `"*.example.com"` matches the bare
/// domain and any subdomain at any depth.
///
/// ```
/// use sumi_search::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}

/// Why a discovered link is not followed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeDecision {
    /// The link may be offered to the frontier
    Follow,
    /// The host matches a blocked-domain pattern
    Blocked,
    /// The host is not one of the job's seed hosts
    OffSite,
}

/// Per-job link scoping rules
#[derive(Debug, Clone)]
pub struct LinkScope {
    seed_hosts: Option<HashSet<String>>,
    blocked: Vec<String>,
}

impl LinkScope {
    /// Builds the scope for a job from its seeds and the crawler configuration
    pub fn new(seeds: &[Url], config: &CrawlerConfig) -> Self {
        let seed_hosts = config
            .stay_on_seed_hosts
            .then(|| seeds.iter().filter_map(extract_domain).collect());

        Self {
            seed_hosts,
            blocked: config.blocked_domains.clone(),
        }
    }

    /// Classifies a URL against the blocked list and the seed-host rule
    ///
    /// The blocked list wins over everything, seeds included.
    pub fn decide(&self, url: &Url) -> ScopeDecision {
        let Some(domain) = extract_domain(url) else {
            return ScopeDecision::Blocked;
        };

        if self.blocked.iter().any(|p| matches_wildcard(p, &domain)) {
            return ScopeDecision::Blocked;
        }

        match &self.seed_hosts {
            Some(hosts) if !hosts.contains(&domain) => ScopeDecision::OffSite,
            _ => ScopeDecision::Follow,
        }
    }
}
