//! The `Session` handle handed out by the registry.

use super::binding::{BackwardsInvocation, PluginRuntime, SessionBindings};
use super::envelope::{self, StreamEvent};
use super::record::{CloseSessionPayload, SessionRecord};
use super::types::AccessAction;
use crate::error::{Result, SessionError};
use crate::registry::SessionDirectory;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// A plugin invocation's routing and correlation context.
///
/// Cloning is cheap and every clone of a live session shares the same
/// bindings, so a runtime bound after a lookup is visible to earlier holders.
/// A session rebuilt from the shared cache is a detached snapshot: it has no
/// bindings and cannot acquire any.
#[derive(Clone)]
pub struct Session {
    record: Arc<SessionRecord>,
    bindings: Option<Arc<SessionBindings>>,
}

impl Session {
    pub(crate) fn live(record: SessionRecord, bindings: SessionBindings) -> Self {
        Self {
            record: Arc::new(record),
            bindings: Some(Arc::new(bindings)),
        }
    }

    /// A view of `record` without live bindings, as another process sees it.
    pub fn detached(record: SessionRecord) -> Self {
        Self {
            record: Arc::new(record),
            bindings: None,
        }
    }

    /// Drop the live bindings from this handle.
    pub fn to_snapshot(&self) -> Self {
        Self {
            record: self.record.clone(),
            bindings: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn is_detached(&self) -> bool {
        self.bindings.is_none()
    }

    /// Whether `other` refers to the same live registry entry.
    pub fn same_entry(&self, other: &Session) -> bool {
        match (&self.bindings, &other.bindings) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn live_bindings(&self) -> Result<&SessionBindings> {
        self.bindings
            .as_deref()
            .ok_or_else(|| SessionError::DetachedSession {
                session_id: self.record.id.clone(),
            })
    }

    /// Attach the outbound connection, replacing any previous one.
    pub fn bind_runtime(&self, runtime: Arc<dyn PluginRuntime>) -> Result<()> {
        self.live_bindings()?.set_runtime(Some(runtime));
        debug!(session_id = %self.record.id, "Runtime bound");
        Ok(())
    }

    pub fn unbind_runtime(&self) {
        if let Some(bindings) = &self.bindings {
            bindings.set_runtime(None);
        }
    }

    pub fn runtime(&self) -> Option<Arc<dyn PluginRuntime>> {
        self.bindings.as_ref().and_then(|b| b.runtime())
    }

    /// Attach the callback channel, replacing any previous one.
    pub fn bind_backwards_invocation(&self, handle: Arc<dyn BackwardsInvocation>) -> Result<()> {
        self.live_bindings()?.set_backwards_invocation(Some(handle));
        Ok(())
    }

    pub fn backwards_invocation(&self) -> Option<Arc<dyn BackwardsInvocation>> {
        self.bindings
            .as_ref()
            .and_then(|b| b.backwards_invocation())
    }

    /// Envelope bytes for `data` tagged with `event`.
    pub fn message<T: Serialize + ?Sized>(&self, event: StreamEvent, data: &T) -> Result<Vec<u8>> {
        envelope::encode(&self.record, event, data)
    }

    /// Deliver an event to the bound runtime.
    ///
    /// Fails with [`SessionError::RuntimeNotBound`] when nothing is bound,
    /// which is always the case for a detached snapshot.
    pub fn write<T: Serialize + ?Sized>(
        &self,
        event: StreamEvent,
        action: AccessAction,
        data: &T,
    ) -> Result<()> {
        let runtime = self
            .runtime()
            .ok_or_else(|| SessionError::RuntimeNotBound {
                session_id: self.record.id.clone(),
            })?;

        let payload = self.message(event, data)?;
        runtime.write(&self.record.id, action, payload);
        Ok(())
    }

    /// Remove this session from `registry` (and its mirror, unless ignored).
    pub fn close(&self, registry: &dyn SessionDirectory, payload: CloseSessionPayload) {
        registry.close_session(self, payload);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("record", &self.record)
            .field("bindings", &self.bindings)
            .finish()
    }
}
