//! JSON-RPC request handlers.

use crate::outbox::OutboxFrame;
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use session_core::{
    AccessAction, AccessType, DeleteSessionPayload, GetSessionPayload, NewSessionPayload,
    PluginDeclaration, PluginUniqueIdentifier, Result, SessionDirectory, SessionError,
    StreamEvent,
};
use std::sync::Arc;
use tracing::{debug, error};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }
}

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}({:?})", method, params);

    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(id, json!({"status": "ok"}))),
        );
    }

    // Cache backends block (SQLite busy timeout), so dispatch off the runtime.
    let dispatch_state = state.clone();
    let dispatch_name = method.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        dispatch_method(&dispatch_state, &dispatch_name, params)
    })
    .await
    .unwrap_or_else(|e| Err(SessionError::Other(format!("RPC task failed: {}", e))));

    match outcome {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            (
                StatusCode::OK,
                Json(JsonRpcResponse::error(id, e.to_rpc_error_code(), e.to_string())),
            )
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| SessionError::InvalidParams {
        message: e.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct CreateSessionParams {
    #[serde(default)]
    tenant_id: String,
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    plugin_unique_identifier: Option<String>,
    #[serde(default)]
    cluster_id: Option<String>,
    #[serde(default)]
    invoke_from: AccessType,
    #[serde(default)]
    action: AccessAction,
    #[serde(default)]
    declaration: Option<Value>,
    #[serde(default)]
    ignore_cache: bool,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    app_id: Option<String>,
    #[serde(default)]
    endpoint_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionIdParams {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WriteSessionParams {
    id: String,
    event: StreamEvent,
    action: AccessAction,
    #[serde(default)]
    data: Value,
}

fn frame_to_json(frame: OutboxFrame) -> Value {
    // Envelopes are always JSON; anything else is passed through as text.
    let payload = serde_json::from_slice::<Value>(&frame.payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&frame.payload).into_owned()));
    json!({
        "session_id": frame.session_id,
        "action": frame.action,
        "payload": payload,
    })
}

// ============================================================================
// Dispatch
// ============================================================================

fn dispatch_method(state: &AppState, method: &str, params: Value) -> Result<Value> {
    match method {
        "create_session" => {
            let p: CreateSessionParams = parse_params(params)?;
            let plugin_unique_identifier = match p.plugin_unique_identifier {
                Some(raw) => PluginUniqueIdentifier::new(raw)?,
                None => PluginUniqueIdentifier::default(),
            };

            let session = state.registry.create_session(NewSessionPayload {
                tenant_id: p.tenant_id,
                user_id: p.user_id,
                plugin_unique_identifier,
                cluster_id: p.cluster_id.unwrap_or_else(|| state.cluster_id.clone()),
                invoke_from: p.invoke_from,
                action: p.action,
                declaration: p.declaration.map(|d| Arc::new(PluginDeclaration::new(d))),
                backwards_invocation: None,
                ignore_cache: p.ignore_cache,
                conversation_id: p.conversation_id,
                message_id: p.message_id,
                app_id: p.app_id,
                endpoint_id: p.endpoint_id,
            });

            Ok(json!({ "session": session.record() }))
        }

        "get_session" => {
            let p: GetSessionPayload = parse_params(params)?;
            match state.registry.try_get_session(p)? {
                Some(session) => Ok(json!({
                    "session": session.record(),
                    "detached": session.is_detached(),
                })),
                None => Ok(json!({ "session": null, "detached": false })),
            }
        }

        "delete_session" => {
            let p: DeleteSessionPayload = parse_params(params)?;
            let id = p.id.clone();
            state.registry.delete_session(p);
            state.drop_outbox(&id);
            Ok(json!({ "deleted": true }))
        }

        "bind_outbox" => {
            let p: SessionIdParams = parse_params(params)?;
            state.bind_outbox(&p.id)?;
            Ok(json!({ "bound": true }))
        }

        "write_session" => {
            let p: WriteSessionParams = parse_params(params)?;
            let session = state.require_session(&p.id)?;
            session.write(p.event, p.action, &p.data)?;
            Ok(json!({ "written": true }))
        }

        "drain_outbox" => {
            let p: SessionIdParams = parse_params(params)?;
            let frames: Vec<Value> = state
                .existing_outbox(&p.id)
                .map(|outbox| outbox.drain().into_iter().map(frame_to_json).collect())
                .unwrap_or_default();
            Ok(json!({ "frames": frames }))
        }

        "list_sessions" => {
            let mut ids = state.registry.session_ids();
            ids.sort_unstable();
            Ok(json!({ "session_ids": ids }))
        }

        "cache_stats" => Ok(json!({ "stats": state.registry.cache_stats() })),

        _ => Err(SessionError::MethodNotFound {
            method: method.to_string(),
        }),
    }
}
