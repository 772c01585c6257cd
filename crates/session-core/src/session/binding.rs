//! Live, process-local handles attached to a session.

use super::types::AccessAction;
use crate::error::Result;
use std::sync::{Arc, PoisonError, RwLock};

/// Outbound connection to a running plugin.
///
/// Delivery is the connection's concern; the registry neither waits for nor
/// observes an acknowledgement.
pub trait PluginRuntime: Send + Sync {
    fn write(&self, session_id: &str, action: AccessAction, payload: Vec<u8>);
}

/// Host-side channel a plugin uses to call back into the host.
#[async_trait::async_trait]
pub trait BackwardsInvocation: Send + Sync {
    async fn invoke(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value>;
}

/// Bindings for one session.
///
/// Each slot has its own lock, so a bind racing a write on the same session
/// is serialized without touching the registry's membership lock.
#[derive(Default)]
pub struct SessionBindings {
    runtime: RwLock<Option<Arc<dyn PluginRuntime>>>,
    backwards_invocation: RwLock<Option<Arc<dyn BackwardsInvocation>>>,
}

impl SessionBindings {
    pub fn new(backwards_invocation: Option<Arc<dyn BackwardsInvocation>>) -> Self {
        Self {
            runtime: RwLock::new(None),
            backwards_invocation: RwLock::new(backwards_invocation),
        }
    }

    // Slots only ever hold a whole Option, so a poisoned lock still guards a
    // consistent value.
    pub fn set_runtime(&self, runtime: Option<Arc<dyn PluginRuntime>>) {
        *self.runtime.write().unwrap_or_else(PoisonError::into_inner) = runtime;
    }

    pub fn runtime(&self) -> Option<Arc<dyn PluginRuntime>> {
        self.runtime
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_backwards_invocation(&self, handle: Option<Arc<dyn BackwardsInvocation>>) {
        *self
            .backwards_invocation
            .write()
            .unwrap_or_else(PoisonError::into_inner) = handle;
    }

    pub fn backwards_invocation(&self) -> Option<Arc<dyn BackwardsInvocation>> {
        self.backwards_invocation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl std::fmt::Debug for SessionBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBindings")
            .field("runtime", &self.runtime().is_some())
            .field("backwards_invocation", &self.backwards_invocation().is_some())
            .finish()
    }
}
