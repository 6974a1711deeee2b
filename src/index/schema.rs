//! Database schema definitions
//!
//! `documents` is the source of truth; `documents_fts` mirrors its
//! searchable columns (in attribute-priority order) and is kept in sync by
//! triggers.

/// SQL schema for the index database
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    description TEXT,
    keywords TEXT,
    content TEXT NOT NULL,
    word_count INTEGER NOT NULL,
    crawled_at TEXT NOT NULL,
    crawled_at_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_word_count ON documents(word_count);
CREATE INDEX IF NOT EXISTS idx_documents_crawled_at ON documents(crawled_at_ms);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    title,
    description,
    keywords,
    content,
    url,
    tokenize = 'unicode61 remove_diacritics 2'
);

CREATE TRIGGER IF NOT EXISTS documents_after_insert AFTER INSERT ON documents BEGIN
    INSERT INTO documents_fts (rowid, title, description, keywords, content, url)
    VALUES (new.seq, new.title, coalesce(new.description, ''),
            coalesce(new.keywords, ''), new.content, new.url);
END;

CREATE TRIGGER IF NOT EXISTS documents_after_delete AFTER DELETE ON documents BEGIN
    DELETE FROM documents_fts WHERE rowid = old.seq;
END;
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_triggers_mirror_rows() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        conn.execute(
            "INSERT INTO documents (id, url, title, content, word_count, crawled_at, crawled_at_ms)
             VALUES ('a', 'https://e.com/', 'Rust', 'ownership and borrowing', 3, 't', 0)",
            [],
        )
        .unwrap();

        let hits: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM documents_fts WHERE documents_fts MATCH 'borrowing'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hits, 1);

        conn.execute("DELETE FROM documents", []).unwrap();
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents_fts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 0);
    }
}
