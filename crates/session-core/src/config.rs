//! Centralized configuration for the session registry.
//!
//! Constant holders for session mirroring, shared-cache defaults and the RPC
//! host. Runtime choices (which cache backend, TTL override) go through
//! [`crate::SessionRegistryBuilder`] and [`crate::cache::SharedCacheSettings`].

use std::time::Duration;

/// Session mirroring configuration.
pub struct SessionConfig;

impl SessionConfig {
    /// How long a mirrored session stays visible to other processes.
    pub const MIRROR_TTL: Duration = Duration::from_secs(30 * 60);
    /// Longest mirror TTL a registry accepts; larger values are clamped.
    pub const MAX_MIRROR_TTL: Duration = Duration::from_secs(24 * 60 * 60);
    pub const CACHE_KEY_PREFIX: &'static str = "session_info:";
    pub const CACHE_NAMESPACE: &'static str = "plugin_sessions";
}

/// Shared cache defaults.
pub struct CacheDefaults;

impl CacheDefaults {
    pub const SQLITE_BUSY_TIMEOUT_MS: u32 = 5_000;
    /// Upper bound on entries held by the in-memory backend.
    pub const MEMORY_MAX_CAPACITY: u64 = 100_000;
    /// Upper bound on any single entry's lifetime in the in-memory backend.
    /// Matches the mirror TTL ceiling so mirrors are never cut short.
    pub const MEMORY_MAX_TTL: Duration = SessionConfig::MAX_MIRROR_TTL;
    pub const SQLITE_SCHEME: &'static str = "sqlite://";
    pub const MEMORY_SCHEME: &'static str = "memory://";
}

/// RPC host configuration.
pub struct RpcConfig;

impl RpcConfig {
    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const EXPIRED_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
    /// Frames queued per outbox; writes beyond this are dropped until drained.
    pub const OUTBOX_CAPACITY: usize = 1024;
    pub const MAX_CONCURRENT_REQUESTS: usize = 256;
}
