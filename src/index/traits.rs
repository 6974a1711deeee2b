//! Index client trait
//!
//! This module defines the contract the crawl pipeline and the query layer
//! rely on, independent of the engine behind it.

use crate::index::{Document, EngineQuery, EngineResult, IndexSettings, IndexStats};
use crate::IndexError;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Trait for index engine implementations
///
/// Implementations are shared between the HTTP handlers and running crawl
/// jobs, so every method takes `&self` and must be safe to call from several
/// tasks at once.
pub trait IndexClient: Send + Sync {
    /// The configuration the engine is running with
    fn settings(&self) -> &IndexSettings;

    /// Inserts a document or replaces the one with the same id or URL
    fn upsert(&self, document: &Document) -> IndexResult<()>;

    /// Removes every document
    fn clear_all(&self) -> IndexResult<()>;

    /// Document count, write activity and per-field distribution
    fn stats(&self) -> IndexResult<IndexStats>;

    /// Runs a planned query and returns one ranked page of hits
    fn search(&self, query: &EngineQuery) -> IndexResult<EngineResult>;
}
