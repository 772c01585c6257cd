//! SQLite-backed shared cache.
//!
//! Several processes on one host can open the same database file; WAL mode and
//! a busy timeout let them mirror and fetch sessions concurrently.

use super::traits::{CacheBackend, CacheEntry};
use crate::config::CacheDefaults;
use crate::error::{Result, SessionError};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Timestamps are stored fixed-width so string comparison orders them.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback)
}

/// SQLite-based cache backend.
///
/// Thread-safe via internal mutex on the connection.
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open (or create) a cache database at the specified path.
    ///
    /// Creates the parent directory and tables if they don't exist.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SessionError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| SessionError::Database {
            message: format!("Failed to open cache database: {}", e),
            source: Some(e),
        })?;

        Self::from_connection(conn)
    }

    /// Create a cache backed by a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\n\
             PRAGMA busy_timeout={};\n\
             PRAGMA synchronous=NORMAL;",
            CacheDefaults::SQLITE_BUSY_TIMEOUT_MS,
        ))
        .map_err(|e| SessionError::Database {
            message: format!("Failed to set pragmas: {}", e),
            source: Some(e),
        })
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value BLOB NOT NULL,
                cached_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );

            CREATE INDEX IF NOT EXISTS idx_cache_expires
                ON cache_entries(namespace, expires_at);
            "#,
        )
        .map_err(|e| SessionError::Database {
            message: format!("Failed to initialize cache schema: {}", e),
            source: Some(e),
        })
    }

    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SessionError::CacheUnavailable {
            message: "Failed to acquire cache connection lock".to_string(),
        })
    }
}

impl CacheBackend for SqliteCache {
    fn get_entry(&self, namespace: &str, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.lock_conn()?;
        let now = Utc::now();

        let row: Option<(Vec<u8>, String, String)> = conn
            .query_row(
                r#"
                SELECT value, cached_at, expires_at
                FROM cache_entries
                WHERE namespace = ?1 AND key = ?2 AND expires_at > ?3
                "#,
                params![namespace, key, timestamp(now)],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| SessionError::Database {
                message: format!("Failed to query cache entry: {}", e),
                source: Some(e),
            })?;

        Ok(row.map(|(value, cached_at, expires_at)| CacheEntry {
            value,
            cached_at: parse_timestamp(&cached_at, now),
            expires_at: parse_timestamp(&expires_at, now),
        }))
    }

    fn set_with_expiry(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO cache_entries
            (namespace, key, value, cached_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                namespace,
                key,
                value,
                timestamp(Utc::now()),
                timestamp(expires_at)
            ],
        )
        .map_err(|e| SessionError::Database {
            message: format!("Failed to set cache entry: {}", e),
            source: Some(e),
        })?;

        Ok(())
    }

    fn invalidate(&self, namespace: &str, key: &str) -> Result<bool> {
        let conn = self.lock_conn()?;

        let deleted = conn
            .execute(
                "DELETE FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
            )
            .map_err(|e| SessionError::Database {
                message: format!("Failed to invalidate cache entry: {}", e),
                source: Some(e),
            })?;

        Ok(deleted > 0)
    }

    fn cleanup_expired(&self) -> Result<usize> {
        let conn = self.lock_conn()?;

        let deleted = conn
            .execute(
                "DELETE FROM cache_entries WHERE expires_at <= ?1",
                params![timestamp(Utc::now())],
            )
            .map_err(|e| SessionError::Database {
                message: format!("Failed to cleanup expired entries: {}", e),
                source: Some(e),
            })?;

        if deleted > 0 {
            debug!("Cleaned up {} expired cache entries", deleted);
        }

        Ok(deleted)
    }

    fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        let conn = self.lock_conn()?;

        let deleted = conn
            .execute(
                "DELETE FROM cache_entries WHERE namespace = ?1",
                params![namespace],
            )
            .map_err(|e| SessionError::Database {
                message: format!("Failed to clear namespace: {}", e),
                source: Some(e),
            })?;

        debug!(
            "Cleared {} entries from namespace '{}'",
            deleted, namespace
        );

        Ok(deleted)
    }
}
