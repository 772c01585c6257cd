//! Best-effort mirror of session records into the shared cache.
//!
//! `mirror` and `evict` never fail the caller: errors are logged and counted.
//! `fetch` keeps a miss (`Ok(None)`) apart from a transport failure (`Err`),
//! leaving it to the registry to decide how much of that to surface.

use super::traits::CacheBackend;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::session::SessionRecord;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared-cache key for a session id.
pub fn session_key(id: &str) -> String {
    format!("{}{}", SessionConfig::CACHE_KEY_PREFIX, id)
}

/// Point-in-time counters for cache bridge activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheBridgeStats {
    pub mirrored: u64,
    pub mirror_failures: u64,
    pub fetch_hits: u64,
    pub fetch_misses: u64,
    pub fetch_failures: u64,
    pub evicted: u64,
    pub evict_failures: u64,
}

#[derive(Default)]
struct Counters {
    mirrored: AtomicU64,
    mirror_failures: AtomicU64,
    fetch_hits: AtomicU64,
    fetch_misses: AtomicU64,
    fetch_failures: AtomicU64,
    evicted: AtomicU64,
    evict_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheBridgeStats {
        CacheBridgeStats {
            mirrored: self.mirrored.load(Ordering::Relaxed),
            mirror_failures: self.mirror_failures.load(Ordering::Relaxed),
            fetch_hits: self.fetch_hits.load(Ordering::Relaxed),
            fetch_misses: self.fetch_misses.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            evict_failures: self.evict_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializes session records into a [`CacheBackend`] under one namespace.
#[derive(Clone)]
pub struct CacheBridge {
    backend: Arc<dyn CacheBackend>,
    namespace: String,
    counters: Arc<Counters>,
}

impl CacheBridge {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_namespace(backend, SessionConfig::CACHE_NAMESPACE)
    }

    pub fn with_namespace(backend: Arc<dyn CacheBackend>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Store a snapshot of `record` for `ttl`. Failures are logged, not returned.
    pub fn mirror(&self, record: &SessionRecord, ttl: Duration) {
        let key = session_key(&record.id);
        let outcome = serde_json::to_vec(record)
            .map_err(SessionError::from)
            .and_then(|bytes| self.backend.set(&self.namespace, &key, &bytes, ttl));

        match outcome {
            Ok(()) => {
                Counters::bump(&self.counters.mirrored);
                debug!(session_id = %record.id, "Mirrored session to shared cache");
            }
            Err(e) => {
                Counters::bump(&self.counters.mirror_failures);
                warn!(session_id = %record.id, "Set session info to cache failed: {}", e);
            }
        }
    }

    /// Look up a mirrored snapshot.
    ///
    /// An undecodable entry is treated as a miss: a peer running another
    /// schema has no usable record for us.
    pub fn fetch(&self, id: &str) -> Result<Option<SessionRecord>> {
        let bytes = match self.backend.get(&self.namespace, &session_key(id)) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                Counters::bump(&self.counters.fetch_misses);
                return Ok(None);
            }
            Err(e) => {
                Counters::bump(&self.counters.fetch_failures);
                return Err(SessionError::CacheUnavailable {
                    message: e.to_string(),
                });
            }
        };

        match serde_json::from_slice::<SessionRecord>(&bytes) {
            Ok(record) => {
                Counters::bump(&self.counters.fetch_hits);
                Ok(Some(record))
            }
            Err(e) => {
                Counters::bump(&self.counters.fetch_misses);
                warn!(session_id = id, "Discarding undecodable session info: {}", e);
                Ok(None)
            }
        }
    }

    /// Remove a mirrored snapshot. Failures are logged, not returned.
    pub fn evict(&self, id: &str) {
        match self.backend.invalidate(&self.namespace, &session_key(id)) {
            Ok(removed) => {
                if removed {
                    Counters::bump(&self.counters.evicted);
                }
            }
            Err(e) => {
                Counters::bump(&self.counters.evict_failures);
                warn!(session_id = id, "Delete session info from cache failed: {}", e);
            }
        }
    }

    pub fn stats(&self) -> CacheBridgeStats {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, MemoryCache};
    use crate::session::{AccessAction, AccessType, NewSessionPayload};
    use chrono::{DateTime, Utc};

    struct BrokenCache;

    impl CacheBackend for BrokenCache {
        fn get_entry(&self, _: &str, _: &str) -> Result<Option<CacheEntry>> {
            Err(SessionError::CacheUnavailable {
                message: "connection refused".into(),
            })
        }

        fn set_with_expiry(&self, _: &str, _: &str, _: &[u8], _: DateTime<Utc>) -> Result<()> {
            Err(SessionError::CacheUnavailable {
                message: "connection refused".into(),
            })
        }

        fn invalidate(&self, _: &str, _: &str) -> Result<bool> {
            Err(SessionError::CacheUnavailable {
                message: "connection refused".into(),
            })
        }

        fn cleanup_expired(&self) -> Result<usize> {
            Ok(0)
        }

        fn clear_namespace(&self, _: &str) -> Result<usize> {
            Ok(0)
        }
    }

    fn record() -> SessionRecord {
        SessionRecord::from_payload(
            "sess-1".to_string(),
            &NewSessionPayload {
                tenant_id: "t1".into(),
                invoke_from: AccessType::Tool,
                action: AccessAction::InvokeTool,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_session_key_format() {
        assert_eq!(session_key("abc"), "session_info:abc");
    }

    #[test]
    fn test_mirror_then_fetch() {
        let bridge = CacheBridge::new(Arc::new(MemoryCache::new()));
        bridge.mirror(&record(), Duration::from_secs(60));

        let fetched = bridge.fetch("sess-1").unwrap().unwrap();
        assert_eq!(fetched.tenant_id, "t1");
        assert_eq!(bridge.stats().mirrored, 1);
        assert_eq!(bridge.stats().fetch_hits, 1);
    }

    #[test]
    fn test_evict_removes_snapshot() {
        let bridge = CacheBridge::new(Arc::new(MemoryCache::new()));
        bridge.mirror(&record(), Duration::from_secs(60));
        bridge.evict("sess-1");

        assert!(bridge.fetch("sess-1").unwrap().is_none());
        assert_eq!(bridge.stats().evicted, 1);
        assert_eq!(bridge.stats().fetch_misses, 1);
    }

    #[test]
    fn test_failures_are_counted_not_raised() {
        let bridge = CacheBridge::new(Arc::new(BrokenCache));
        bridge.mirror(&record(), Duration::from_secs(60));
        bridge.evict("sess-1");

        let stats = bridge.stats();
        assert_eq!(stats.mirror_failures, 1);
        assert_eq!(stats.evict_failures, 1);
        assert!(matches!(
            bridge.fetch("sess-1"),
            Err(SessionError::CacheUnavailable { .. })
        ));
        assert_eq!(bridge.stats().fetch_failures, 1);
    }

    #[test]
    fn test_unrepresentable_ttl_counts_as_mirror_failure() {
        let bridge = CacheBridge::new(Arc::new(MemoryCache::new()));
        bridge.mirror(&record(), Duration::MAX);
        bridge.mirror(&record(), Duration::from_secs(10_000_000_000_000));

        let stats = bridge.stats();
        assert_eq!(stats.mirrored, 0);
        assert_eq!(stats.mirror_failures, 2);
        assert!(bridge.fetch("sess-1").unwrap().is_none());
    }

    #[test]
    fn test_garbage_entry_is_a_miss() {
        let backend = Arc::new(MemoryCache::new());
        backend
            .set(
                SessionConfig::CACHE_NAMESPACE,
                &session_key("junk"),
                b"not json",
                Duration::from_secs(60),
            )
            .unwrap();

        let bridge = CacheBridge::new(backend);
        assert!(bridge.fetch("junk").unwrap().is_none());
    }
}
