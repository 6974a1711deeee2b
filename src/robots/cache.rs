//! Per-job robots.txt cache
//!
//! Each origin's robots.txt is fetched at most once per job, even when
//! several workers ask about the same origin at the same time.

use crate::robots::{fetch_robots, RobotsRules};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use url::Url;

/// Robots.txt rules keyed by origin, filled lazily
#[derive(Debug)]
pub struct RobotsCache {
    client: Client,
    user_agent: String,
    entries: Mutex<HashMap<String, Arc<OnceCell<RobotsRules>>>>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to fetch robots.txt
    /// * `user_agent` - Product token matched against `User-agent` groups
    pub fn new(client: Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn cell(&self, origin: &str) -> Arc<OnceCell<RobotsRules>> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(entries.entry(origin.to_string()).or_default())
    }

    /// Checks `url` against its origin's robots.txt, fetching it on first use
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let origin = url.origin().ascii_serialization();
        let cell = self.cell(&origin);
        let rules = cell
            .get_or_init(|| fetch_robots(&self.client, url))
            .await;
        rules.is_allowed(url.as_str(), &self.user_agent)
    }

    /// Number of origins looked up so far
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
