use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::default_cache_path;
use crate::infra::sqlite::schema::open_connection;
use crate::usecase::ports::cache::{CacheError, CountCache};

/// Count cache persisted in its own SQLite database.
pub struct SqliteCountCache {
    conn: Mutex<Connection>,
}

impl SqliteCountCache {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
        }
        Self::from_connection(open_connection(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory cache")?;
        Self::from_connection(conn)
    }

    /// Opens the cache at [`default_cache_path`].
    pub fn open_default() -> Result<Self> {
        Self::open(&default_cache_path()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS grid_count (
                key        TEXT PRIMARY KEY,
                total      INTEGER NOT NULL,
                stored_at  INTEGER NOT NULL
            );
            ",
        )
        .context("failed to initialize count cache schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Unavailable("cache connection lock poisoned".to_string()))
    }

    /// When the count under `key` was last written.
    pub fn stored_at(&self, key: &str) -> Result<Option<DateTime<Utc>>, CacheError> {
        let seconds = self
            .conn()?
            .query_row(
                "SELECT stored_at FROM grid_count WHERE key = ?1",
                [key],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|err| CacheError::Unavailable(err.to_string()))?;

        match seconds {
            Some(seconds) => DateTime::from_timestamp(seconds, 0)
                .map(Some)
                .ok_or_else(|| CacheError::Corrupt {
                    key: key.to_string(),
                    message: format!("invalid timestamp {seconds}"),
                }),
            None => Ok(None),
        }
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        self.conn()?
            .query_row("SELECT COUNT(*) FROM grid_count", [], |row| row.get::<_, i64>(0))
            .map(|count| count as usize)
            .map_err(|err| CacheError::Unavailable(err.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool, CacheError> {
        self.len().map(|len| len == 0)
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.conn()?
            .execute("DELETE FROM grid_count", [])
            .map(|_| ())
            .map_err(|err| CacheError::Unavailable(err.to_string()))
    }
}

impl CountCache for SqliteCountCache {
    fn load(&self, key: &str) -> Result<Option<u64>, CacheError> {
        let total = self
            .conn()?
            .query_row(
                "SELECT total FROM grid_count WHERE key = ?1",
                [key],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(|err| CacheError::Unavailable(err.to_string()))?;

        match total {
            Some(total) => u64::try_from(total)
                .map(Some)
                .map_err(|_| CacheError::Corrupt {
                    key: key.to_string(),
                    message: format!("negative count {total}"),
                }),
            None => Ok(None),
        }
    }

    fn store(&self, key: &str, total: u64) -> Result<(), CacheError> {
        let total = i64::try_from(total).map_err(|_| CacheError::Corrupt {
            key: key.to_string(),
            message: format!("count {total} does not fit in INTEGER"),
        })?;

        self.conn()?
            .execute(
                "INSERT INTO grid_count(key, total, stored_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                    total = excluded.total,
                    stored_at = excluded.stored_at",
                params![key, total, Utc::now().timestamp()],
            )
            .map(|_| ())
            .map_err(|err| CacheError::Unavailable(err.to_string()))
    }
}
