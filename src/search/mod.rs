//! Query planning
//!
//! Turns raw search parameters into a validated [`EngineQuery`] and the
//! engine's result into the public response shape.

mod params;

pub use params::{parse_timestamp, DateBound};

use crate::index::{Document, EngineQuery, EngineResult, Filters, SortField, SortOrder, SortSpec};
use crate::ValidationError;
use serde::{Deserialize, Serialize};

/// Page size when the caller gives none
pub const DEFAULT_LIMIT: i64 = 20;

/// Larger page sizes are clamped to this
pub const MAX_LIMIT: i64 = 1000;

/// Offsets above this are rejected
pub const MAX_OFFSET: i64 = 10_000;

/// Raw search parameters as received
///
/// Everything is kept as text so that bad values can be reported by name
/// instead of failing deserialization as a whole. Empty strings count as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub min_word_count: Option<String>,
    pub max_word_count: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
}

/// Public search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub hits: Vec<Document>,
    pub processing_time_ms: u64,
    pub query: String,
    pub total_hits: u64,
}

/// Validates search requests and shapes engine results
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Validates `params` and applies defaults
    ///
    /// # Rules
    ///
    /// | Parameter | Default | Constraint |
    /// |-----------|---------|------------|
    /// | `q` | `""` | empty matches every document |
    /// | `limit` | 20 | must be > 0; above 1000 is clamped |
    /// | `offset` | 0 | 0..=10000, otherwise rejected |
    /// | `sort_by` | relevance | `crawled_at` or `word_count` |
    /// | `sort_order` | `asc` | `asc` or `desc` |
    /// | `min_word_count` / `max_word_count` | open | inclusive, min ≤ max |
    /// | `from_date` / `to_date` | open | ISO-8601, inclusive, from ≤ to |
    pub fn plan(&self, params: &SearchParams) -> Result<EngineQuery, ValidationError> {
        let q = params.q.clone().unwrap_or_default();

        let limit = match parse_int("limit", &params.limit)? {
            None => DEFAULT_LIMIT,
            Some(n) if n <= 0 => {
                return Err(ValidationError::OutOfRange {
                    name: "limit",
                    message: "must be greater than 0".to_string(),
                })
            }
            Some(n) => n.min(MAX_LIMIT),
        };

        let offset = match parse_int("offset", &params.offset)? {
            None => 0,
            Some(n) if !(0..=MAX_OFFSET).contains(&n) => {
                return Err(ValidationError::OutOfRange {
                    name: "offset",
                    message: format!("must be between 0 and {}", MAX_OFFSET),
                })
            }
            Some(n) => n,
        };

        let sort = self.plan_sort(params)?;
        let filters = self.plan_filters(params)?;

        Ok(EngineQuery {
            q,
            filters,
            sort,
            limit: limit as usize,
            offset: offset as usize,
        })
    }

    fn plan_sort(&self, params: &SearchParams) -> Result<Option<SortSpec>, ValidationError> {
        let order = match present(&params.sort_order) {
            None => SortOrder::default(),
            Some(v) if v.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            Some(v) if v.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            Some(v) => {
                return Err(ValidationError::InvalidValue {
                    name: "sort_order",
                    value: v.to_string(),
                })
            }
        };

        let field = match present(&params.sort_by) {
            None => return Ok(None),
            Some("crawled_at") => SortField::CrawledAt,
            Some("word_count") => SortField::WordCount,
            Some(v) => {
                return Err(ValidationError::InvalidValue {
                    name: "sort_by",
                    value: v.to_string(),
                })
            }
        };

        Ok(Some(SortSpec { field, order }))
    }

    fn plan_filters(&self, params: &SearchParams) -> Result<Filters, ValidationError> {
        let min_word_count = parse_count("min_word_count", &params.min_word_count)?;
        let max_word_count = parse_count("max_word_count", &params.max_word_count)?;
        if let (Some(min), Some(max)) = (min_word_count, max_word_count) {
            if min > max {
                return Err(ValidationError::OutOfRange {
                    name: "min_word_count",
                    message: "must not exceed max_word_count".to_string(),
                });
            }
        }

        let from_date = present(&params.from_date)
            .map(|v| parse_timestamp("from_date", v, DateBound::Start))
            .transpose()?;
        let to_date = present(&params.to_date)
            .map(|v| parse_timestamp("to_date", v, DateBound::End))
            .transpose()?;
        if let (Some(from), Some(to)) = (from_date, to_date) {
            if from > to {
                return Err(ValidationError::OutOfRange {
                    name: "from_date",
                    message: "must not be after to_date".to_string(),
                });
            }
        }

        Ok(Filters {
            min_word_count,
            max_word_count,
            from_date,
            to_date,
        })
    }

    /// Builds the public response for `query`
    pub fn render(&self, result: EngineResult, query: String) -> SearchResponse {
        SearchResponse {
            hits: result.hits,
            processing_time_ms: result.processing_time_ms,
            query,
            total_hits: result.total_hits,
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_int(name: &'static str, value: &Option<String>) -> Result<Option<i64>, ValidationError> {
    present(value)
        .map(|v| {
            v.parse::<i64>().map_err(|_| ValidationError::InvalidValue {
                name,
                value: v.to_string(),
            })
        })
        .transpose()
}

fn parse_count(name: &'static str, value: &Option<String>) -> Result<Option<u64>, ValidationError> {
    match parse_int(name, value)? {
        Some(n) if n < 0 => Err(ValidationError::OutOfRange {
            name,
            message: "must not be negative".to_string(),
        }),
        other => Ok(other.map(|n| n as u64)),
    }
}
