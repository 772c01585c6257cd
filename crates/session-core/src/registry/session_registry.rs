//! Process-wide directory of live sessions.

use crate::cache::{CacheBackend, CacheBridge, CacheBridgeStats};
use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::{
    CloseSessionPayload, DeleteSessionPayload, GetSessionPayload, NewSessionPayload, Session,
    SessionBindings, SessionRecord,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Create, look up and tear down sessions.
///
/// Implementations must tolerate any number of concurrent callers.
pub trait SessionDirectory: Send + Sync {
    /// Register a new session. Never fails; cache mirroring is best effort.
    fn create_session(&self, payload: NewSessionPayload) -> Session;

    /// Local registry first, then the shared cache unless `ignore_cache`.
    ///
    /// A cache transport failure reads as "not found"; use
    /// [`SessionDirectory::try_get_session`] to tell the two apart.
    fn get_session(&self, payload: GetSessionPayload) -> Option<Session>;

    /// Like `get_session`, but surfaces an unreachable cache as
    /// [`crate::SessionError::CacheUnavailable`].
    fn try_get_session(&self, payload: GetSessionPayload) -> Result<Option<Session>>;

    /// Remove a session if present. Absent ids are not an error.
    fn delete_session(&self, payload: DeleteSessionPayload);

    fn close_session(&self, session: &Session, payload: CloseSessionPayload) {
        self.delete_session(DeleteSessionPayload {
            id: session.id().to_string(),
            ignore_cache: payload.ignore_cache,
        });
    }
}

/// In-process session registry with optional shared-cache mirroring.
///
/// Membership is guarded by a single read/write lock held only for the map
/// operation itself; cache calls happen outside it.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    cache: Option<CacheBridge>,
    mirror_ttl: Duration,
}

impl SessionRegistry {
    /// Registry without a shared cache; sessions are visible to this process only.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_cache(backend: Arc<dyn CacheBackend>) -> Self {
        Self::builder().cache(backend).build()
    }

    pub fn builder() -> SessionRegistryBuilder {
        SessionRegistryBuilder::default()
    }

    // Map operations cannot leave the table half-updated, so a poisoned lock
    // still guards a consistent map.
    fn read_sessions(&self) -> RwLockReadGuard<'_, HashMap<String, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<String, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_local(&self, id: &str) -> Option<Session> {
        self.read_sessions().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_sessions().is_empty()
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.read_sessions().keys().cloned().collect()
    }

    pub fn mirror_ttl(&self) -> Duration {
        self.mirror_ttl
    }

    pub fn cache(&self) -> Option<&CacheBridge> {
        self.cache.as_ref()
    }

    pub fn cache_stats(&self) -> Option<CacheBridgeStats> {
        self.cache.as_ref().map(CacheBridge::stats)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionDirectory for SessionRegistry {
    fn create_session(&self, payload: NewSessionPayload) -> Session {
        let bindings = SessionBindings::new(payload.backwards_invocation.clone());

        let session = {
            let mut sessions = self.write_sessions();
            let id = loop {
                let id = uuid::Uuid::new_v4().to_string();
                if !sessions.contains_key(&id) {
                    break id;
                }
            };
            let session = Session::live(SessionRecord::from_payload(id.clone(), &payload), bindings);
            sessions.insert(id, session.clone());
            session
        };

        debug!(
            session_id = %session.id(),
            tenant_id = %payload.tenant_id,
            action = ?payload.action,
            "Session created"
        );

        if !payload.ignore_cache {
            if let Some(cache) = &self.cache {
                cache.mirror(session.record(), self.mirror_ttl);
            }
        }

        session
    }

    fn get_session(&self, payload: GetSessionPayload) -> Option<Session> {
        match self.try_get_session(payload) {
            Ok(found) => found,
            Err(e) => {
                warn!("Get session info from cache failed: {}", e);
                None
            }
        }
    }

    fn try_get_session(&self, payload: GetSessionPayload) -> Result<Option<Session>> {
        if let Some(session) = self.get_local(&payload.id) {
            return Ok(Some(session));
        }

        if payload.ignore_cache {
            return Ok(None);
        }

        // Not ours; another node may have created it.
        let Some(cache) = &self.cache else {
            return Ok(None);
        };

        Ok(cache.fetch(&payload.id)?.map(Session::detached))
    }

    fn delete_session(&self, payload: DeleteSessionPayload) {
        let removed = self.write_sessions().remove(&payload.id).is_some();
        if removed {
            debug!(session_id = %payload.id, "Session deleted");
        }

        if !payload.ignore_cache {
            if let Some(cache) = &self.cache {
                cache.evict(&payload.id);
            }
        }
    }
}

/// Builder for [`SessionRegistry`].
pub struct SessionRegistryBuilder {
    cache: Option<Arc<dyn CacheBackend>>,
    namespace: String,
    mirror_ttl: Duration,
}

impl Default for SessionRegistryBuilder {
    fn default() -> Self {
        Self {
            cache: None,
            namespace: SessionConfig::CACHE_NAMESPACE.to_string(),
            mirror_ttl: SessionConfig::MIRROR_TTL,
        }
    }
}

impl SessionRegistryBuilder {
    /// Mirror sessions into `backend` for cross-process lookups.
    pub fn cache(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(backend);
        self
    }

    /// Namespace used inside the cache backend.
    ///
    /// Default: `plugin_sessions`
    pub fn cache_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// How long mirrored snapshots stay fetchable.
    ///
    /// Default: 30 minutes. Clamped to [`SessionConfig::MAX_MIRROR_TTL`].
    pub fn mirror_ttl(mut self, ttl: Duration) -> Self {
        if ttl > SessionConfig::MAX_MIRROR_TTL {
            warn!(
                "Mirror TTL {:?} exceeds {:?}, clamping",
                ttl,
                SessionConfig::MAX_MIRROR_TTL
            );
        }
        self.mirror_ttl = ttl.min(SessionConfig::MAX_MIRROR_TTL);
        self
    }

    pub fn build(self) -> SessionRegistry {
        let namespace = self.namespace;
        SessionRegistry {
            sessions: RwLock::new(HashMap::new()),
            cache: self
                .cache
                .map(|backend| CacheBridge::with_namespace(backend, namespace)),
            mirror_ttl: self.mirror_ttl,
        }
    }
}
