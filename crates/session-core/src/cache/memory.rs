//! In-process cache backend.
//!
//! Stands in for the shared cache in tests and single-node deployments. The
//! underlying `mini_moka` cache bounds capacity and maximum lifetime; the
//! per-entry expiry requested by callers is checked on every read.

use super::traits::{CacheBackend, CacheEntry};
use crate::config::CacheDefaults;
use crate::error::Result;
use chrono::{DateTime, Utc};
use mini_moka::sync::Cache;
use std::sync::Arc;

type EntryKey = (String, String);

/// `mini_moka`-backed cache with per-entry expiry.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<EntryKey, Arc<CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_capacity(CacheDefaults::MEMORY_MAX_CAPACITY)
    }

    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(CacheDefaults::MEMORY_MAX_TTL)
                .build(),
        }
    }

    fn entry_key(namespace: &str, key: &str) -> EntryKey {
        (namespace.to_string(), key.to_string())
    }

    fn live_keys(&self, now: DateTime<Utc>) -> (Vec<EntryKey>, Vec<EntryKey>) {
        let mut live = Vec::new();
        let mut expired = Vec::new();
        for (key, entry) in self.entries.iter().map(|e| (e.key().clone(), e.value().clone())) {
            if entry.is_expired_at(now) {
                expired.push(key);
            } else {
                live.push(key);
            }
        }
        (live, expired)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryCache {
    fn get_entry(&self, namespace: &str, key: &str) -> Result<Option<CacheEntry>> {
        let entry_key = Self::entry_key(namespace, key);
        match self.entries.get(&entry_key) {
            Some(entry) if entry.is_expired_at(Utc::now()) => {
                self.entries.invalidate(&entry_key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.as_ref().clone())),
            None => Ok(None),
        }
    }

    fn set_with_expiry(
        &self,
        namespace: &str,
        key: &str,
        value: &[u8],
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let entry = CacheEntry {
            value: value.to_vec(),
            cached_at: Utc::now(),
            expires_at,
        };
        self.entries
            .insert(Self::entry_key(namespace, key), Arc::new(entry));
        Ok(())
    }

    fn invalidate(&self, namespace: &str, key: &str) -> Result<bool> {
        let entry_key = Self::entry_key(namespace, key);
        let existed = self
            .entries
            .get(&entry_key)
            .is_some_and(|entry| !entry.is_expired_at(Utc::now()));
        self.entries.invalidate(&entry_key);
        Ok(existed)
    }

    fn cleanup_expired(&self) -> Result<usize> {
        let (_, expired) = self.live_keys(Utc::now());
        for key in &expired {
            self.entries.invalidate(key);
        }
        Ok(expired.len())
    }

    fn clear_namespace(&self, namespace: &str) -> Result<usize> {
        let (live, expired) = self.live_keys(Utc::now());
        let mut cleared = 0;
        for key in live.iter().chain(expired.iter()) {
            if key.0 == namespace {
                self.entries.invalidate(key);
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}
