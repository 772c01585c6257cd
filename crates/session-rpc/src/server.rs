//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_rpc};
use crate::outbox::Outbox;
use axum::{
    routing::{get, post},
    Router,
};
use session_core::config::RpcConfig;
use session_core::{
    CacheBackend, GetSessionPayload, Result, Session, SessionDirectory, SessionError,
    SessionRegistry,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Application state shared across handlers.
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    /// Outboxes bound to sessions owned by this host, keyed by session id.
    outboxes: Mutex<HashMap<String, Arc<Outbox>>>,
    /// Default cluster id stamped on sessions that don't name one.
    pub cluster_id: String,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, cluster_id: String) -> Self {
        Self {
            registry,
            outboxes: Mutex::new(HashMap::new()),
            cluster_id,
        }
    }

    /// Look up a session, treating absence as an error.
    pub fn require_session(&self, id: &str) -> Result<Session> {
        self.registry
            .try_get_session(GetSessionPayload {
                id: id.to_string(),
                ignore_cache: false,
            })?
            .ok_or_else(|| SessionError::SessionNotFound {
                session_id: id.to_string(),
            })
    }

    /// Bind an outbox (created on first use) as the session's runtime.
    ///
    /// The outbox table stays locked from lookup to insert, and deletes drop
    /// the outbox only after the registry entry is gone, so an outbox is never
    /// left behind for a deleted session.
    pub fn bind_outbox(&self, id: &str) -> Result<Arc<Outbox>> {
        let mut outboxes = self.outboxes.lock().unwrap_or_else(PoisonError::into_inner);
        let session = self.require_session(id)?;
        let outbox = outboxes
            .get(id)
            .cloned()
            .unwrap_or_else(|| Arc::new(Outbox::new(RpcConfig::OUTBOX_CAPACITY)));
        session.bind_runtime(outbox.clone())?;
        outboxes.insert(id.to_string(), outbox.clone());
        Ok(outbox)
    }

    pub fn existing_outbox(&self, id: &str) -> Option<Arc<Outbox>> {
        self.outboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn drop_outbox(&self, id: &str) {
        self.outboxes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

/// Purge expired mirror entries on a fixed interval.
fn spawn_expired_sweep(backend: Arc<dyn CacheBackend>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(RpcConfig::EXPIRED_SWEEP_INTERVAL);
        // The first tick completes immediately; startup already swept.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match backend.cleanup_expired() {
                Ok(0) => {}
                Ok(removed) => debug!("Swept {} expired cache entries", removed),
                Err(e) => warn!("Expired cache sweep failed: {}", e),
            }
        }
    });
}

/// Start the JSON-RPC HTTP server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(
    registry: Arc<SessionRegistry>,
    cluster_id: String,
    host: &str,
    port: u16,
) -> anyhow::Result<SocketAddr> {
    if let Some(cache) = registry.cache() {
        spawn_expired_sweep(cache.backend().clone());
    }

    let state = Arc::new(AppState::new(registry, cluster_id));

    // Configure CORS for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/rpc", post(handle_rpc))
        .layer(ConcurrencyLimitLayer::new(RpcConfig::MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_core::{DeleteSessionPayload, MemoryCache, NewSessionPayload};

    #[tokio::test]
    async fn test_server_starts() {
        let registry = Arc::new(SessionRegistry::with_cache(Arc::new(MemoryCache::new())));
        let addr = start_server(registry, "cluster".into(), "127.0.0.1", 0)
            .await
            .unwrap();
        assert!(addr.port() > 0);
    }

    #[test]
    fn test_require_session_missing() {
        let state = AppState::new(Arc::new(SessionRegistry::new()), "c".into());
        let err = state.require_session("missing").unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound { .. }));
    }

    #[test]
    fn test_bind_outbox_is_stable_until_dropped() {
        let state = AppState::new(Arc::new(SessionRegistry::new()), "c".into());
        let id = state
            .registry
            .create_session(NewSessionPayload::default())
            .id()
            .to_string();

        let first = state.bind_outbox(&id).unwrap();
        assert!(Arc::ptr_eq(&first, &state.bind_outbox(&id).unwrap()));

        state.drop_outbox(&id);
        assert!(state.existing_outbox(&id).is_none());
    }

    #[test]
    fn test_bind_outbox_leaves_nothing_for_dead_sessions() {
        let backend = Arc::new(MemoryCache::new());
        let owner = SessionRegistry::with_cache(backend.clone());
        let state = AppState::new(Arc::new(SessionRegistry::with_cache(backend)), "c".into());

        let err = state.bind_outbox("missing").unwrap_err();
        assert!(matches!(err, SessionError::SessionNotFound { .. }));
        assert!(state.existing_outbox("missing").is_none());

        // Visible only as a detached snapshot from the peer's cache.
        let id = owner
            .create_session(NewSessionPayload::default())
            .id()
            .to_string();
        let err = state.bind_outbox(&id).unwrap_err();
        assert!(matches!(err, SessionError::DetachedSession { .. }));
        assert!(state.existing_outbox(&id).is_none());
    }

    #[test]
    fn test_concurrent_bind_and_delete_leave_no_orphans() {
        let state = AppState::new(Arc::new(SessionRegistry::new()), "c".into());

        for _ in 0..200 {
            let id = state
                .registry
                .create_session(NewSessionPayload {
                    ignore_cache: true,
                    ..Default::default()
                })
                .id()
                .to_string();

            std::thread::scope(|scope| {
                scope.spawn(|| {
                    let _ = state.bind_outbox(&id);
                });
                scope.spawn(|| {
                    state.registry.delete_session(DeleteSessionPayload {
                        id: id.clone(),
                        ignore_cache: true,
                    });
                    state.drop_outbox(&id);
                });
            });

            assert!(state.existing_outbox(&id).is_none());
        }
    }
}
