//! Robots.txt handling module
//!
//! When a job runs with robots.txt respected, every URL is checked against
//! its origin's rules before it is fetched. Disallowed URLs are skipped,
//! not counted as failures.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsRules;

use reqwest::Client;
use url::Url;

/// Fetches robots.txt for the origin of `url`
///
/// A robots.txt that cannot be retrieved (4xx, 5xx, network failure, non-UTF-8
/// body) yields [`RobotsRules::allow_all`].
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - Any URL on the origin
pub async fn fetch_robots(client: &Client, url: &Url) -> RobotsRules {
    let Ok(robots_url) = url.join("/robots.txt") else {
        return RobotsRules::allow_all();
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", robots_url, e);
            return RobotsRules::allow_all();
        }
    };

    if !response.status().is_success() {
        tracing::debug!("{} returned {}, allowing all", robots_url, response.status());
        return RobotsRules::allow_all();
    }

    match response.text().await {
        Ok(body) => RobotsRules::from_content(&body),
        Err(e) => {
            tracing::debug!("Failed to read {}: {}", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}
