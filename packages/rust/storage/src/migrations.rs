//! SQL migration definitions for the Blogsmith database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: articles, FTS5",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Original and derived articles in one table
CREATE TABLE IF NOT EXISTS articles (
    id                TEXT PRIMARY KEY,
    title             TEXT NOT NULL,
    body              TEXT NOT NULL,
    excerpt           TEXT NOT NULL DEFAULT '',
    source_url        TEXT NOT NULL UNIQUE,
    author            TEXT NOT NULL,
    is_derived        INTEGER NOT NULL DEFAULT 0,
    original_id       TEXT REFERENCES articles(id) ON DELETE SET NULL,
    version           INTEGER NOT NULL DEFAULT 0,
    references_json   TEXT NOT NULL DEFAULT '[]',
    generation_method TEXT,
    generation_model  TEXT,
    generated_at      TEXT,
    word_count        INTEGER NOT NULL DEFAULT 0,
    fetched_at        TEXT NOT NULL,
    created_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_is_derived ON articles(is_derived);
CREATE INDEX IF NOT EXISTS idx_articles_original_id ON articles(original_id);

-- Full-text search on articles
CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts USING fts5(
    title,
    body,
    content=articles,
    content_rowid=rowid
);

-- Triggers to keep FTS in sync with the articles table
CREATE TRIGGER IF NOT EXISTS articles_fts_insert AFTER INSERT ON articles BEGIN
    INSERT INTO articles_fts(rowid, title, body)
    VALUES (new.rowid, new.title, new.body);
END;

CREATE TRIGGER IF NOT EXISTS articles_fts_delete AFTER DELETE ON articles BEGIN
    INSERT INTO articles_fts(articles_fts, rowid, title, body)
    VALUES ('delete', old.rowid, old.title, old.body);
END;

CREATE TRIGGER IF NOT EXISTS articles_fts_update AFTER UPDATE ON articles BEGIN
    INSERT INTO articles_fts(articles_fts, rowid, title, body)
    VALUES ('delete', old.rowid, old.title, old.body);
    INSERT INTO articles_fts(rowid, title, body)
    VALUES (new.rowid, new.title, new.body);
END;

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
