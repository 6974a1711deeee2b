//! SQLite index implementation
//!
//! This module provides a durable, FTS5-backed implementation of the
//! IndexClient trait.

use crate::index::ranking::{compare, query_terms, Ranked};
use crate::index::schema::initialize_schema;
use crate::index::traits::{IndexClient, IndexResult};
use crate::index::{
    count_words, Document, EngineQuery, EngineResult, Filters, IndexSettings, IndexStats,
};
use crate::IndexError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// SQLite index backend
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    settings: IndexSettings,
    writes_in_flight: AtomicUsize,
}

/// A row as stored, before decoding
struct StoredRow {
    seq: i64,
    id: String,
    url: String,
    title: String,
    description: Option<String>,
    keywords: Option<String>,
    content: String,
    crawled_at: String,
}

const ROW_COLUMNS: &str = "seq, id, url, title, description, keywords, content, crawled_at";

impl StoredRow {
    fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get(0)?,
            id: row.get(1)?,
            url: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            keywords: row.get(5)?,
            content: row.get(6)?,
            crawled_at: row.get(7)?,
        })
    }
}

/// Marks a write as in progress for the lifetime of the guard
struct WriteGuard<'a>(&'a AtomicUsize);

impl<'a> WriteGuard<'a> {
    fn begin(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SqliteIndex {
    /// Opens or creates the index database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteIndex)` - Successfully opened/created database
    /// * `Err(IndexError)` - Failed to open database
    pub fn new(path: &Path) -> IndexResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory index
    pub fn new_in_memory() -> IndexResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            settings: IndexSettings::default(),
            writes_in_flight: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> IndexResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IndexError::Unavailable("index connection lock poisoned".to_string()))
    }

    /// Ranks every row matching the query terms and filters
    ///
    /// Rows are measured as they are read and only their sort keys are
    /// kept. Without terms there is nothing to measure, so content is never
    /// read.
    fn rank_candidates(
        conn: &Connection,
        terms: &[String],
        filters: &Filters,
    ) -> IndexResult<Vec<Ranked>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if !terms.is_empty() {
            clauses.push("seq IN (SELECT rowid FROM documents_fts WHERE documents_fts MATCH ?)");
            values.push(Value::Text(match_expression(terms)));
        }
        if let Some(min) = filters.min_word_count {
            clauses.push("word_count >= ?");
            values.push(Value::Integer(sql_int(min)));
        }
        if let Some(max) = filters.max_word_count {
            clauses.push("word_count <= ?");
            values.push(Value::Integer(sql_int(max)));
        }
        if let Some(from) = filters.from_date {
            clauses.push("crawled_at_ms >= ?");
            values.push(Value::Integer(from.timestamp_millis()));
        }
        if let Some(to) = filters.to_date {
            clauses.push("crawled_at_ms <= ?");
            values.push(Value::Integer(to.timestamp_millis()));
        }

        let mut sql = if terms.is_empty() {
            String::from("SELECT seq, crawled_at_ms, word_count FROM documents")
        } else {
            format!("SELECT {} FROM documents", ROW_COLUMNS)
        };
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(values.iter()))?;
        let mut ranked = Vec::new();

        while let Some(row) = rows.next()? {
            if terms.is_empty() {
                let word_count: i64 = row.get(2)?;
                ranked.push(Ranked {
                    seq: row.get(0)?,
                    signals: Default::default(),
                    crawled_at_ms: row.get(1)?,
                    word_count: u64::try_from(word_count).unwrap_or(0),
                });
            } else {
                let stored = StoredRow::read(row)?;
                let seq = stored.seq;
                ranked.push(Ranked::of(seq, terms, &decode(stored)?));
            }
        }

        Ok(ranked)
    }

    /// Loads full documents for `seqs`, in that order
    fn load_page(conn: &Connection, seqs: &[i64]) -> IndexResult<Vec<Document>> {
        if seqs.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; seqs.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM documents WHERE seq IN ({})",
            ROW_COLUMNS, placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(seqs.iter()))?;

        let mut by_seq = HashMap::with_capacity(seqs.len());
        while let Some(row) = rows.next()? {
            let stored = StoredRow::read(row)?;
            by_seq.insert(stored.seq, decode(stored)?);
        }

        Ok(seqs.iter().filter_map(|seq| by_seq.remove(seq)).collect())
    }
}

impl IndexClient for SqliteIndex {
    fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    // ===== Writes =====

    fn upsert(&self, document: &Document) -> IndexResult<()> {
        let _writing = WriteGuard::begin(&self.writes_in_flight);

        let keywords = document
            .keywords
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let word_count = sql_int(count_words(&document.content));
        let crawled_at = document
            .crawled_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM documents WHERE id = ?1 OR url = ?2",
            params![document.id, document.url],
        )?;
        tx.execute(
            "INSERT INTO documents (id, url, title, description, keywords, content, word_count, crawled_at, crawled_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                document.id,
                document.url,
                document.title,
                document.description,
                keywords,
                document.content,
                word_count,
                crawled_at,
                document.crawled_at.timestamp_millis(),
            ],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn clear_all(&self) -> IndexResult<()> {
        let _writing = WriteGuard::begin(&self.writes_in_flight);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute_batch("DELETE FROM documents; DELETE FROM documents_fts;")?;
        tx.commit()?;

        Ok(())
    }

    // ===== Reads =====

    fn stats(&self) -> IndexResult<IndexStats> {
        let (total, with_description, with_keywords): (i64, i64, i64) = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT COUNT(*), COUNT(description), COUNT(keywords) FROM documents",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?
        };

        let total = total as u64;
        let mut field_distribution = BTreeMap::new();
        for field in ["id", "url", "title", "content", "word_count", "crawled_at"] {
            field_distribution.insert(field.to_string(), total);
        }
        field_distribution.insert("description".to_string(), with_description as u64);
        field_distribution.insert("keywords".to_string(), with_keywords as u64);
        field_distribution.retain(|_, count| *count > 0);

        Ok(IndexStats {
            document_count: total,
            is_indexing: self.writes_in_flight.load(Ordering::SeqCst) > 0,
            field_distribution,
        })
    }

    fn search(&self, query: &EngineQuery) -> IndexResult<EngineResult> {
        let started = Instant::now();
        let terms = query_terms(&query.q);

        let conn = self.lock()?;
        let mut ranked = Self::rank_candidates(&conn, &terms, &query.filters)?;
        ranked.sort_by(|a, b| compare(a, b, query.sort));

        let total_hits = ranked.len() as u64;
        let page: Vec<i64> = ranked
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|r| r.seq)
            .collect();
        let hits = Self::load_page(&conn, &page)?;

        Ok(EngineResult {
            hits,
            total_hits,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// FTS5 expression: terms OR'ed, the last one as a prefix
fn match_expression(terms: &[String]) -> String {
    let last = terms.len().saturating_sub(1);
    terms
        .iter()
        .enumerate()
        .map(|(i, term)| {
            if i == last {
                format!("\"{}\"*", term)
            } else {
                format!("\"{}\"", term)
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

fn sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn decode(row: StoredRow) -> IndexResult<Document> {
    let keywords = row
        .keywords
        .as_deref()
        .map(serde_json::from_str::<Vec<String>>)
        .transpose()?;
    let crawled_at = DateTime::parse_from_rfc3339(&row.crawled_at)
        .map_err(|e| IndexError::Corrupt(format!("crawled_at {:?}: {}", row.crawled_at, e)))?
        .with_timezone(&Utc);

    Ok(Document {
        word_count: count_words(&row.content),
        id: row.id,
        url: row.url,
        title: row.title,
        description: row.description,
        keywords,
        content: row.content,
        crawled_at,
    })
}
