//! Session Core - per-invocation session state for long-lived plugin processes.
//!
//! A [`SessionRegistry`] creates, finds and removes sessions. Sessions created
//! here carry live bindings (the plugin's outbound connection and its callback
//! channel); sessions created by another process are visible through the
//! shared cache as detached snapshots that can be inspected but not written to.
//!
//! # Example
//!
//! ```rust,ignore
//! use session_core::{
//!     AccessAction, GetSessionPayload, NewSessionPayload, SessionDirectory, SessionRegistry,
//!     StreamEvent,
//! };
//!
//! let registry = SessionRegistry::new();
//! let session = registry.create_session(NewSessionPayload {
//!     tenant_id: "tenant".into(),
//!     ..Default::default()
//! });
//! session.bind_runtime(connection)?;
//! session.write(StreamEvent::Request, AccessAction::InvokeTool, &serde_json::json!({"x": 1}))?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use cache::{
    init_shared_cache, CacheBackend, CacheBridge, CacheBridgeStats, MemoryCache,
    SharedCacheSettings, SqliteCache,
};
pub use error::{Result, SessionError};
pub use registry::{SessionDirectory, SessionRegistry, SessionRegistryBuilder};
pub use session::{
    AccessAction, AccessType, BackwardsInvocation, CloseSessionPayload, DeleteSessionPayload,
    GetSessionPayload, NewSessionPayload, PluginDeclaration, PluginRuntime,
    PluginUniqueIdentifier, Session, SessionRecord, StreamEvent,
};
