//! Index module: document model and full-text engine
//!
//! This module holds everything on the index side of the pipeline:
//! - the [`Document`] schema
//! - the [`IndexClient`] contract (upsert, clear, stats, search)
//! - the engine configuration the pipeline depends on
//! - a durable SQLite/FTS5 implementation of the contract

mod document;
mod ranking;
mod schema;
mod sqlite;
mod traits;

pub use document::{count_words, document_id, Document};
pub use ranking::{tokenize, RankingRule, RANKING_RULES};
pub use sqlite::SqliteIndex;
pub use traits::{IndexClient, IndexResult};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Searchable attributes, highest priority first
pub const SEARCHABLE_ATTRIBUTES: [&str; 5] = ["title", "description", "keywords", "content", "url"];

/// Attributes usable in filters and sorts
pub const FILTERABLE_ATTRIBUTES: [&str; 2] = ["crawled_at", "word_count"];

/// Engine configuration required by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    pub searchable_attributes: Vec<&'static str>,
    pub filterable_attributes: Vec<&'static str>,
    pub sortable_attributes: Vec<&'static str>,
    pub ranking_rules: Vec<RankingRule>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            searchable_attributes: SEARCHABLE_ATTRIBUTES.to_vec(),
            filterable_attributes: FILTERABLE_ATTRIBUTES.to_vec(),
            sortable_attributes: FILTERABLE_ATTRIBUTES.to_vec(),
            ranking_rules: RANKING_RULES.to_vec(),
        }
    }
}

/// Index health report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub document_count: u64,
    pub is_indexing: bool,
    pub field_distribution: BTreeMap<String, u64>,
}

/// Field a caller may sort by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CrawledAt,
    WordCount,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrawledAt => "crawled_at",
            Self::WordCount => "word_count",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Caller-specified sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

/// Inclusive range filters; `None` bounds are open
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub min_word_count: Option<u64>,
    pub max_word_count: Option<u64>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A validated query in the engine's terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineQuery {
    pub q: String,
    pub filters: Filters,
    pub sort: Option<SortSpec>,
    pub limit: usize,
    pub offset: usize,
}

/// One ranked page of results
#[derive(Debug, Clone)]
pub struct EngineResult {
    pub hits: Vec<Document>,
    /// Documents matching query and filters, before pagination
    pub total_hits: u64,
    pub processing_time_ms: u64,
}

/// Opens (or creates) the on-disk index at `path`
pub fn open_index(path: &Path) -> IndexResult<SqliteIndex> {
    SqliteIndex::new(path)
}
