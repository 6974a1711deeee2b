use serde::Deserialize;

/// Main configuration structure for Sumi-Search
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Depth used when a crawl request does not specify one
    pub max_depth: u32,

    /// Largest depth a caller may request
    pub max_depth_limit: u32,

    /// Maximum number of fetches in flight at once
    pub max_concurrent: u32,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Cleaned body text is truncated to this many characters
    pub max_content_length: usize,

    /// Pages whose cleaned body is shorter than this are discarded
    pub min_content_length: usize,

    /// Upper bound on fetches dispatched by a single job
    pub max_pages_per_job: Option<u32>,

    /// Wall-clock limit for a single job (seconds)
    pub job_timeout_secs: Option<u64>,

    /// Minimum time between requests to the same host (milliseconds)
    pub politeness_delay_ms: u64,

    /// Skip URLs disallowed by the host's robots.txt
    pub respect_robots_txt: bool,

    /// Only follow links that stay on a seed URL's host
    pub stay_on_seed_hosts: bool,

    /// Domain patterns (e.g. "*.example.com") that are never fetched
    pub blocked_domains: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_depth_limit: 10,
            max_concurrent: 8,
            request_timeout_secs: 15,
            max_content_length: 50_000,
            min_content_length: 50,
            max_pages_per_job: None,
            job_timeout_secs: None,
            politeness_delay_ms: 0,
            respect_robots_txt: false,
            stay_on_seed_hosts: true,
            blocked_domains: Vec::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SumiSearch".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/bot".to_string(),
            contact_email: "bot@example.com".to_string(),
        }
    }
}

/// Index storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IndexConfig {
    /// Path to the SQLite index database
    pub database_path: String,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerConfig {
    /// Socket address the API listens on
    pub listen_addr: String,

    /// Allow requests from any origin
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            cors_permissive: true,
        }
    }
}
