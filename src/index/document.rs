//! The unit of indexing

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A cleaned page ready for the index
///
/// Built only through [`Document::new`], which derives `id` from the URL and
/// `word_count` from the exact stored `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier derived from the URL
    pub id: String,

    /// Canonical source URL
    pub url: String,

    /// Page title, possibly empty
    pub title: String,

    /// Meta or OpenGraph description
    pub description: Option<String>,

    /// Meta keywords in document order
    pub keywords: Option<Vec<String>>,

    /// Cleaned plain-text body
    pub content: String,

    /// Whitespace-delimited token count of `content`
    pub word_count: u64,

    /// When the page was extracted (millisecond precision, UTC)
    pub crawled_at: DateTime<Utc>,
}

impl Document {
    /// Creates a document stamped with the current time
    pub fn new(
        url: &str,
        title: String,
        description: Option<String>,
        keywords: Option<Vec<String>>,
        content: String,
    ) -> Self {
        Self::with_timestamp(url, title, description, keywords, content, Utc::now())
    }

    /// Creates a document with an explicit extraction time
    pub fn with_timestamp(
        url: &str,
        title: String,
        description: Option<String>,
        keywords: Option<Vec<String>>,
        content: String,
        crawled_at: DateTime<Utc>,
    ) -> Self {
        let word_count = count_words(&content);
        Self {
            id: document_id(url),
            url: url.to_string(),
            title,
            description,
            keywords,
            content,
            word_count,
            crawled_at: crawled_at.trunc_subsecs(3),
        }
    }
}

/// Derives the document id for a URL
///
/// Hex SHA-256 of the URL string; re-crawling a URL yields the same id so
/// the index replaces the earlier document.
pub fn document_id(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Counts whitespace-delimited tokens
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}
