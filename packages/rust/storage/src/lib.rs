//! libSQL storage layer for original and enhanced articles.
//!
//! The [`Storage`] struct wraps a local libSQL database holding both scraped
//! originals and their derived rewrites in one `articles` table, plus an FTS5
//! index over titles and bodies.
//!
//! **Access rules:**
//! - Pipeline commands: read-write via [`Storage::open`]
//! - Listing and search commands may use [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use blogsmith_shared::{
    ArticleId, ArticleRecord, BlogsmithError, EnhancedDocument, GenerationMeta, GenerationMethod,
    ReferenceDocument, Result, SourceDocument,
};
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};

/// Columns selected for every [`ArticleRecord`] query, in `row_to_record` order.
const ARTICLE_COLUMNS: &str = "id, title, body, excerpt, source_url, author, is_derived, \
     original_id, version, references_json, generation_method, generation_model, generated_at, \
     word_count, fetched_at, created_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BlogsmithError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BlogsmithError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(db_err)?;
        let conn = db.connect().map_err(db_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    BlogsmithError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(BlogsmithError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Persist a scraped original. Fails if `source_url` is already stored.
    pub async fn insert_original(&self, doc: &SourceDocument) -> Result<ArticleRecord> {
        self.check_writable()?;

        let record = ArticleRecord {
            id: ArticleId::new(),
            title: doc.title.clone(),
            body: doc.body.clone(),
            excerpt: doc.excerpt.clone(),
            source_url: doc.source_url.clone(),
            author: doc.author.clone(),
            is_derived: false,
            original_id: None,
            version: 0,
            references: Vec::new(),
            generation: None,
            word_count: doc.word_count,
            fetched_at: doc.fetched_at,
            created_at: Utc::now(),
        };

        self.insert_record(&record).await?;
        tracing::debug!(id = %record.id, url = %record.source_url, "original stored");
        Ok(record)
    }

    /// Persist a derived rewrite as the next version for its original.
    ///
    /// The first derived record gets `<original>-enhanced` as its source URL;
    /// later runs get `-enhanced-v2`, `-enhanced-v3`, and so on.
    pub async fn insert_enhanced(&self, doc: &EnhancedDocument) -> Result<ArticleRecord> {
        self.check_writable()?;

        let version = self.latest_version(&doc.original_id).await? + 1;
        let now = Utc::now();

        let record = ArticleRecord {
            id: ArticleId::new(),
            title: doc.title.clone(),
            body: doc.body.clone(),
            excerpt: doc.excerpt.clone(),
            source_url: doc.source_url_for_version(version),
            author: doc.author.clone(),
            is_derived: true,
            original_id: Some(doc.original_id.clone()),
            version,
            references: doc.references.clone(),
            generation: Some(doc.generation.clone()),
            word_count: doc.generation.word_count,
            fetched_at: now,
            created_at: now,
        };

        self.insert_record(&record).await?;
        tracing::debug!(
            id = %record.id,
            original = %doc.original_id,
            version,
            "enhanced version stored"
        );
        Ok(record)
    }

    async fn insert_record(&self, record: &ArticleRecord) -> Result<()> {
        let references_json = serde_json::to_string(&record.references)
            .map_err(|e| BlogsmithError::Storage(format!("failed to encode references: {e}")))?;
        let generation = record.generation.as_ref();

        self.conn
            .execute(
                "INSERT INTO articles (id, title, body, excerpt, source_url, author, is_derived,
                     original_id, version, references_json, generation_method, generation_model,
                     generated_at, word_count, fetched_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    record.id.to_string(),
                    record.title.as_str(),
                    record.body.as_str(),
                    record.excerpt.as_str(),
                    record.source_url.as_str(),
                    record.author.as_str(),
                    i64::from(record.is_derived),
                    record.original_id.as_ref().map(ToString::to_string),
                    record.version,
                    references_json,
                    generation.map(|g| g.method.as_str()),
                    generation.and_then(|g| g.model.clone()),
                    generation.map(|g| g.generated_at.to_rfc3339()),
                    record.word_count as i64,
                    record.fetched_at.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| {
                BlogsmithError::Storage(format!("failed to insert {}: {e}", record.source_url))
            })?;
        Ok(())
    }

    /// Highest derived version stored for `original_id`, or 0.
    async fn latest_version(&self, original_id: &ArticleId) -> Result<u32> {
        let mut rows = self
            .conn
            .query(
                "SELECT COALESCE(MAX(version), 0) FROM articles
                 WHERE is_derived = 1 AND original_id = ?1",
                params![original_id.to_string()],
            )
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => row.get::<u32>(0).map_err(db_err),
            None => Ok(0),
        }
    }

    /// Delete an article by ID. Returns `true` if a row was removed.
    ///
    /// Derived records keep their row when their original is deleted; only
    /// the back-reference is cleared.
    pub async fn delete_article(&self, id: &ArticleId) -> Result<bool> {
        self.check_writable()?;
        self.conn
            .execute(
                "UPDATE articles SET original_id = NULL WHERE original_id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(db_err)?;
        let affected = self
            .conn
            .execute("DELETE FROM articles WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(db_err)?;
        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Look up an article by its source URL.
    pub async fn find_by_source_url(&self, source_url: &str) -> Result<Option<ArticleRecord>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE source_url = ?1");
        self.query_one(&sql, params![source_url]).await
    }

    /// Get an article by ID.
    pub async fn get_article(&self, id: &ArticleId) -> Result<Option<ArticleRecord>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1");
        self.query_one(&sql, params![id.to_string()]).await
    }

    /// All originals, newest first.
    pub async fn list_originals(&self) -> Result<Vec<ArticleRecord>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE is_derived = 0
             ORDER BY created_at DESC, id DESC"
        );
        self.query_all(&sql, params![]).await
    }

    /// All derived records, newest first.
    pub async fn list_enhanced(&self) -> Result<Vec<ArticleRecord>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE is_derived = 1
             ORDER BY created_at DESC, id DESC"
        );
        self.query_all(&sql, params![]).await
    }

    /// Derived records of one original, oldest version first.
    pub async fn list_versions(&self, original_id: &ArticleId) -> Result<Vec<ArticleRecord>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE is_derived = 1 AND original_id = ?1
             ORDER BY version ASC"
        );
        self.query_all(&sql, params![original_id.to_string()]).await
    }

    /// One page of all articles, newest first. `page` is 1-based.
    pub async fn list_articles(&self, page: u32, limit: u32) -> Result<Vec<ArticleRecord>> {
        let limit = limit.max(1);
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles
             ORDER BY created_at DESC, id DESC
             LIMIT ?1 OFFSET ?2"
        );
        self.query_all(&sql, params![limit, offset]).await
    }

    /// Total number of stored articles (originals and derived).
    pub async fn count_articles(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM articles", params![])
            .await
            .map_err(db_err)?;

        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(db_err)?.max(0) as u64),
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // FTS search
    // -----------------------------------------------------------------------

    /// Full-text search across article titles and bodies.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchResult>> {
        let mut rows = self
            .conn
            .query(
                "SELECT a.id, a.title, a.source_url, a.is_derived, rank
                 FROM articles_fts fts
                 JOIN articles a ON a.rowid = fts.rowid
                 WHERE articles_fts MATCH ?1
                 ORDER BY rank
                 LIMIT ?2",
                params![query, limit],
            )
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            let id: String = row.get(0).map_err(db_err)?;
            results.push(SearchResult {
                id: parse_id(&id)?,
                title: row.get(1).map_err(db_err)?,
                source_url: row.get(2).map_err(db_err)?,
                is_derived: row.get::<i64>(3).map_err(db_err)? != 0,
                score: row.get(4).unwrap_or(0.0),
            });
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Query helpers
    // -----------------------------------------------------------------------

    async fn query_one(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<ArticleRecord>> {
        let mut rows = self.conn.query(sql, params).await.map_err(db_err)?;
        match rows.next().await.map_err(db_err)? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn query_all(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<ArticleRecord>> {
        let mut rows = self.conn.query(sql, params).await.map_err(db_err)?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(db_err)? {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }
}

/// A search result from FTS5.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub id: ArticleId,
    pub title: String,
    pub source_url: String,
    pub is_derived: bool,
    /// FTS5 rank score (lower is better).
    pub score: f64,
}

fn db_err(e: libsql::Error) -> BlogsmithError {
    BlogsmithError::Storage(e.to_string())
}

fn parse_id(s: &str) -> Result<ArticleId> {
    s.parse()
        .map_err(|e| BlogsmithError::Storage(format!("invalid article id {s}: {e}")))
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| BlogsmithError::Storage(format!("invalid date: {e}")))
}

/// Convert a database row (selected with [`ARTICLE_COLUMNS`]) to an [`ArticleRecord`].
fn row_to_record(row: &libsql::Row) -> Result<ArticleRecord> {
    let id: String = row.get(0).map_err(db_err)?;
    let original_id = match row.get::<String>(7).ok() {
        Some(s) => Some(parse_id(&s)?),
        None => None,
    };

    let references_json: String = row.get(9).map_err(db_err)?;
    let references: Vec<ReferenceDocument> = serde_json::from_str(&references_json)
        .map_err(|e| BlogsmithError::Storage(format!("invalid references for {id}: {e}")))?;

    let word_count = row.get::<i64>(13).map_err(db_err)?.max(0) as usize;

    let generation = match row.get::<String>(10).ok() {
        Some(method) => {
            let method: GenerationMethod = method.parse().map_err(BlogsmithError::Storage)?;
            let generated_at: String = row.get(12).map_err(db_err)?;
            Some(GenerationMeta {
                method,
                model: row.get::<String>(11).ok(),
                generated_at: parse_time(&generated_at)?,
                word_count,
            })
        }
        None => None,
    };

    let fetched_at: String = row.get(14).map_err(db_err)?;
    let created_at: String = row.get(15).map_err(db_err)?;

    Ok(ArticleRecord {
        id: parse_id(&id)?,
        title: row.get(1).map_err(db_err)?,
        body: row.get(2).map_err(db_err)?,
        excerpt: row.get(3).map_err(db_err)?,
        source_url: row.get(4).map_err(db_err)?,
        author: row.get(5).map_err(db_err)?,
        is_derived: row.get::<i64>(6).map_err(db_err)? != 0,
        original_id,
        version: row.get::<u32>(8).map_err(db_err)?,
        references,
        generation,
        word_count,
        fetched_at: parse_time(&fetched_at)?,
        created_at: parse_time(&created_at)?,
    })
}
