//! Shared cache layer for cross-process session visibility.
//!
//! - [`CacheBackend`]: namespaced key-value store with per-entry TTL
//! - [`SqliteCache`]: file-backed store shared by processes on one host
//! - [`MemoryCache`]: in-process stand-in
//! - [`CacheBridge`]: best-effort mirroring of session records

mod bridge;
mod init;
mod memory;
mod sqlite;
mod traits;

pub use bridge::{session_key, CacheBridge, CacheBridgeStats};
pub use init::{init_shared_cache, SharedCacheSettings};
pub use memory::MemoryCache;
pub use sqlite::SqliteCache;
pub use traits::{expiry_after, CacheBackend, CacheEntry};
