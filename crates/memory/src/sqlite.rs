//! SQLite backend.
//!
//! Uses a single SQLite database file with two tables:
//! - `memories` — append-only memory records, tags stored as a JSON array
//! - `settings` — deployment-level key/value pairs, values stored as JSON
//!
//! Search is plain substring containment via `instr()`, which is
//! case-sensitive and has no wildcard characters (unlike `LIKE`). Tags are
//! matched element by element through `json_each()`.
//!
//! Every access is bounded by [`StoreOptions::timeout`]: the pool acquire
//! timeout, SQLite's busy timeout, and a `tokio::time::timeout` around the
//! query itself.

use async_trait::async_trait;
use oathlink_core::error::StorageError;
use oathlink_core::memory::{MemoryRecord, MemorySearch, MemoryStore, SearchQuery};
use oathlink_core::settings::SettingsStore;
use serde_json::Value;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::StoreOptions;

/// The production memory store: one SQLite file, one connection pool.
pub struct SqliteStore {
    pool: SqlitePool,
    path: PathBuf,
    options: StoreOptions,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Missing parent directories and all tables/indexes are created
    /// automatically.
    pub async fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Open(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let connect = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(options.timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(options.timeout)
            .connect_with(connect)
            .await
            .map_err(|e| StorageError::Open(format!("Failed to open SQLite: {e}")))?;

        let store = Self {
            pool,
            path,
            options,
        };
        store.create_tables().await?;
        info!(path = %store.path.display(), "SQLite memory store opened");
        Ok(store)
    }

    /// The database file backing this store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close every pooled connection. Call once at shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
        info!(path = %self.path.display(), "SQLite memory store closed");
    }

    /// Create tables and indexes if they do not exist yet.
    async fn create_tables(&self) -> Result<(), StorageError> {
        self.bounded(
            "memories table",
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS memories (
                    id      TEXT PRIMARY KEY,
                    content TEXT NOT NULL,
                    tags    TEXT NOT NULL DEFAULT '[]',
                    ts      REAL NOT NULL
                )
                "#,
            )
            .execute(&self.pool),
        )
        .await?;

        self.bounded(
            "ts index",
            sqlx::query("CREATE INDEX IF NOT EXISTS idx_memories_ts ON memories(ts DESC, id ASC)")
                .execute(&self.pool),
        )
        .await?;

        self.bounded(
            "settings table",
            sqlx::query(
                r#"
                CREATE TABLE IF NOT EXISTS settings (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )
                "#,
            )
            .execute(&self.pool),
        )
        .await?;

        debug!("SQLite tables ready");
        Ok(())
    }

    /// Run a query under the configured timeout, mapping failures to
    /// `StorageError`.
    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, StorageError> {
        let timeout_ms = u64::try_from(self.options.timeout.as_millis()).unwrap_or(u64::MAX);
        match tokio::time::timeout(self.options.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(sqlx::Error::PoolTimedOut)) | Err(_) => Err(StorageError::Timeout {
                operation: operation.to_string(),
                timeout_ms,
            }),
            // busy_timeout expired while another connection held the lock
            Ok(Err(sqlx::Error::Database(e))) if is_busy(e.as_ref()) => {
                Err(StorageError::Timeout {
                    operation: operation.to_string(),
                    timeout_ms,
                })
            }
            Ok(Err(e)) => Err(StorageError::Query(format!("{operation}: {e}"))),
        }
    }

    /// Parse a `MemoryRecord` from a SQLite row.
    fn row_to_record(row: &SqliteRow) -> Result<MemoryRecord, StorageError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StorageError::Corrupt(format!("id column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StorageError::Corrupt(format!("content column: {e}")))?;
        let tags_json: String = row
            .try_get("tags")
            .map_err(|e| StorageError::Corrupt(format!("tags column: {e}")))?;
        let timestamp: f64 = row
            .try_get("ts")
            .map_err(|e| StorageError::Corrupt(format!("ts column: {e}")))?;

        let tags: Vec<String> = serde_json::from_str(&tags_json)
            .map_err(|e| StorageError::Corrupt(format!("tags of {id}: {e}")))?;

        Ok(MemoryRecord {
            id,
            content,
            tags,
            timestamp,
        })
    }
}

/// SQLITE_BUSY or SQLITE_LOCKED, including their extended codes.
fn is_busy(e: &dyn sqlx::error::DatabaseError) -> bool {
    e.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

#[async_trait]
impl MemoryStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, record: MemoryRecord) -> Result<(), StorageError> {
        let tags_json = serde_json::to_string(&record.tags)
            .map_err(|e| StorageError::Query(format!("Tags serialization: {e}")))?;

        // Plain INSERT: an id collision must fail, never overwrite.
        self.bounded(
            "INSERT",
            sqlx::query("INSERT INTO memories (id, content, tags, ts) VALUES (?1, ?2, ?3, ?4)")
                .bind(&record.id)
                .bind(&record.content)
                .bind(&tags_json)
                .bind(record.timestamp)
                .execute(&self.pool),
        )
        .await?;

        debug!(id = %record.id, tags = record.tags.len(), "Stored memory");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<MemoryRecord>, StorageError> {
        let row = self
            .bounded(
                "GET by ID",
                sqlx::query("SELECT id, content, tags, ts FROM memories WHERE id = ?1")
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn count(&self) -> Result<usize, StorageError> {
        let row = self
            .bounded(
                "COUNT",
                sqlx::query("SELECT COUNT(*) AS cnt FROM memories").fetch_one(&self.pool),
            )
            .await?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StorageError::Query(format!("cnt column: {e}")))?;

        Ok(usize::try_from(cnt).unwrap_or(0))
    }

    async fn health(&self) -> bool {
        self.bounded("health", sqlx::query("SELECT 1").fetch_one(&self.pool))
            .await
            .is_ok()
    }
}

#[async_trait]
impl MemorySearch for SqliteStore {
    fn max_limit(&self) -> usize {
        self.options.max_limit
    }

    async fn search_query(&self, query: &SearchQuery) -> Result<Vec<MemoryRecord>, StorageError> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let rows = self
            .bounded(
                "search",
                sqlx::query(
                    r#"
                    SELECT id, content, tags, ts
                    FROM memories
                    WHERE instr(content, ?1) > 0
                       OR EXISTS (
                            SELECT 1 FROM json_each(memories.tags) AS t
                            WHERE instr(t.value, ?1) > 0
                       )
                    ORDER BY ts DESC, id ASC
                    LIMIT ?2
                    "#,
                )
                .bind(&query.text)
                .bind(limit)
                .fetch_all(&self.pool),
            )
            .await?;

        let results = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            query_len = query.text.len(),
            limit = query.limit,
            hits = results.len(),
            "Substring search complete"
        );
        Ok(results)
    }
}

#[async_trait]
impl SettingsStore for SqliteStore {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let row = self
            .bounded(
                "GET setting",
                sqlx::query("SELECT value FROM settings WHERE key = ?1")
                    .bind(key)
                    .fetch_optional(&self.pool),
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row
            .try_get("value")
            .map_err(|e| StorageError::Corrupt(format!("value column: {e}")))?;
        let value = serde_json::from_str(&raw)
            .map_err(|e| StorageError::Corrupt(format!("setting {key}: {e}")))?;
        Ok(Some(value))
    }

    async fn put_setting(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let raw = value.to_string();
        self.bounded(
            "PUT setting",
            sqlx::query(
                r#"
                INSERT INTO settings (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value
                "#,
            )
            .bind(key)
            .bind(&raw)
            .execute(&self.pool),
        )
        .await?;

        debug!(key, "Stored setting");
        Ok(())
    }
}
