//! Serializable session state and request payloads.

use super::binding::BackwardsInvocation;
use super::types::{AccessAction, AccessType, PluginDeclaration, PluginUniqueIdentifier};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The persisted half of a session: everything that may cross a process
/// boundary. Live handles live in [`super::SessionBindings`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub plugin_unique_identifier: PluginUniqueIdentifier,
    pub cluster_id: String,
    pub invoke_from: AccessType,
    pub action: AccessAction,
    pub declaration: Option<Arc<PluginDeclaration>>,

    // information about incoming request
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub app_id: Option<String>,
    pub endpoint_id: Option<String>,
}

impl SessionRecord {
    pub fn from_payload(id: String, payload: &NewSessionPayload) -> Self {
        Self {
            id,
            tenant_id: payload.tenant_id.clone(),
            user_id: payload.user_id.clone(),
            plugin_unique_identifier: payload.plugin_unique_identifier.clone(),
            cluster_id: payload.cluster_id.clone(),
            invoke_from: payload.invoke_from,
            action: payload.action,
            declaration: payload.declaration.clone(),
            conversation_id: payload.conversation_id.clone(),
            message_id: payload.message_id.clone(),
            app_id: payload.app_id.clone(),
            endpoint_id: payload.endpoint_id.clone(),
        }
    }
}

/// Attributes for a new session.
#[derive(Clone, Default)]
pub struct NewSessionPayload {
    pub tenant_id: String,
    pub user_id: String,
    pub plugin_unique_identifier: PluginUniqueIdentifier,
    pub cluster_id: String,
    pub invoke_from: AccessType,
    pub action: AccessAction,
    pub declaration: Option<Arc<PluginDeclaration>>,
    /// Bound to the new session before it becomes visible to other callers.
    pub backwards_invocation: Option<Arc<dyn BackwardsInvocation>>,
    /// Skip mirroring to the shared cache.
    pub ignore_cache: bool,
    pub conversation_id: Option<String>,
    pub message_id: Option<String>,
    pub app_id: Option<String>,
    pub endpoint_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetSessionPayload {
    pub id: String,
    /// Only consult the local registry.
    #[serde(default)]
    pub ignore_cache: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteSessionPayload {
    pub id: String,
    /// Leave the shared-cache mirror in place.
    #[serde(default)]
    pub ignore_cache: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CloseSessionPayload {
    #[serde(default)]
    pub ignore_cache: bool,
}
