//! Cache backend trait and types.

use crate::error::{Result, SessionError};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A cached entry with metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached data as bytes.
    pub value: Vec<u8>,
    /// When the entry was cached.
    pub cached_at: DateTime<Utc>,
    /// When the entry expires.
    pub expires_at: DateTime<Utc>,
}

/// Absolute expiry for an entry written now with `ttl`.
///
/// Fails with [`SessionError::Config`] when the deadline is not representable.
pub fn expiry_after(ttl: Duration) -> Result<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| SessionError::Config {
            message: format!("cache ttl {:?} is out of range", ttl),
        })
}

impl CacheEntry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Shared key-value store with per-entry TTL.
///
/// Keys are isolated by namespace. A missing or expired key is `Ok(None)`;
/// `Err` is reserved for the store itself being unreachable or broken, so
/// callers can tell a miss from a transport failure.
/// All operations are synchronous to match rusqlite's API.
pub trait CacheBackend: Send + Sync {
    /// Get cached data by key.
    ///
    /// Returns `None` if the key doesn't exist or has expired.
    fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        self.get_entry(namespace, key)
            .map(|opt| opt.map(|e| e.value))
    }

    /// Get cached data with full entry metadata.
    fn get_entry(&self, namespace: &str, key: &str) -> Result<Option<CacheEntry>>;

    /// Set cached data with TTL.
    ///
    /// Overwrites any existing entry with the same key.
    fn set(&self, namespace: &str, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.set_with_expiry(namespace, key, value, expiry_after(ttl)?)
    }

    /// Set cached data with explicit expiration time.
    fn set_with_expiry(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Invalidate (delete) a specific key. Returns whether anything was removed.
    fn invalidate(&self, namespace: &str, key: &str) -> Result<bool>;

    /// Check if a cache entry exists and is valid (not expired).
    fn is_valid(&self, namespace: &str, key: &str) -> Result<bool> {
        Ok(self.get_entry(namespace, key)?.is_some())
    }

    /// Remove expired entries from all namespaces.
    ///
    /// Returns the number of entries removed.
    fn cleanup_expired(&self) -> Result<usize>;

    /// Remove every entry in a namespace.
    fn clear_namespace(&self, namespace: &str) -> Result<usize>;
}
