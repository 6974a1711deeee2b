//! Robots.txt rules
//!
//! Thin wrapper over the robotstxt crate's matcher.

use robotstxt::DefaultMatcher;

/// Robots.txt rules for one origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsRules {
    /// Raw robots.txt content; `None` allows everything
    content: Option<String>,
}

impl RobotsRules {
    /// Creates rules from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Rules that allow everything
    ///
    /// Used when the origin has no robots.txt or it cannot be retrieved.
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - Full URL or path (e.g. "/page.html")
    /// * `user_agent` - The crawler's product token
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self.content.as_deref() {
            None | Some("") => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
        }
    }
}
