//! Integration tests for the session-rpc JSON-RPC server.
//!
//! Servers run in-process; two servers sharing one SQLite cache file stand in
//! for two hosts in a cluster.

use serde_json::{json, Value};
use session_core::{SessionRegistry, SqliteCache};
use session_rpc::start_server;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Make an RPC call to the server.
async fn rpc_call(port: u16, method: &str, params: Value) -> Result<Value, String> {
    let json = rpc_call_raw(port, method, params).await?;
    if let Some(error) = json.get("error") {
        return Err(error.to_string());
    }
    Ok(json.get("result").cloned().unwrap_or(Value::Null))
}

/// Make an RPC call and return the full JSON-RPC payload.
async fn rpc_call_raw(port: u16, method: &str, params: Value) -> Result<Value, String> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/rpc", port))
        .json(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    response.json::<Value>().await.map_err(|e| e.to_string())
}

async fn error_code(port: u16, method: &str, params: Value) -> i64 {
    let json = rpc_call_raw(port, method, params).await.unwrap();
    json["error"]["code"].as_i64().expect("expected an error response")
}

async fn spawn_server(cache: Arc<SqliteCache>, cluster_id: &str) -> u16 {
    let registry = Arc::new(SessionRegistry::with_cache(cache));
    start_server(registry, cluster_id.to_string(), "127.0.0.1", 0)
        .await
        .expect("Failed to start server")
        .port()
}

fn shared_cache() -> (TempDir, Arc<SqliteCache>) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let cache = SqliteCache::open(temp_dir.path().join("sessions.db")).unwrap();
    (temp_dir, Arc::new(cache))
}

async fn create(port: u16, params: Value) -> String {
    let result = rpc_call(port, "create_session", params).await.unwrap();
    result["session"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_temp, cache) = shared_cache();
    let port = spawn_server(cache, "a").await;

    let client = reqwest::Client::new();
    let json: Value = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["status"], "ok");

    let result = rpc_call(port, "health_check", json!({})).await.unwrap();
    assert_eq!(result["status"], "ok");
}

#[tokio::test]
async fn test_session_lifecycle() {
    let (_temp, cache) = shared_cache();
    let port = spawn_server(cache, "cluster-a").await;

    let id = create(
        port,
        json!({
            "tenant_id": "t1",
            "user_id": "u1",
            "plugin_unique_identifier": "langgenius/openai:0.0.1@0123456789abcdef0123456789abcdef",
            "invoke_from": "model",
            "action": "invoke_llm",
            "conversation_id": "conv-1"
        }),
    )
    .await;

    let found = rpc_call(port, "get_session", json!({"id": id})).await.unwrap();
    assert_eq!(found["detached"], false);
    assert_eq!(found["session"]["tenant_id"], "t1");
    assert_eq!(found["session"]["cluster_id"], "cluster-a");
    assert_eq!(found["session"]["action"], "invoke_llm");

    let listed = rpc_call(port, "list_sessions", json!({})).await.unwrap();
    assert_eq!(listed["session_ids"], json!([id.clone()]));

    rpc_call(port, "delete_session", json!({"id": id})).await.unwrap();

    let gone = rpc_call(port, "get_session", json!({"id": id})).await.unwrap();
    assert!(gone["session"].is_null());
}

#[tokio::test]
async fn test_write_path_through_outbox() {
    let (_temp, cache) = shared_cache();
    let port = spawn_server(cache, "a").await;
    let id = create(port, json!({"message_id": "msg-1"})).await;

    let code = error_code(
        port,
        "write_session",
        json!({"id": id, "event": "request", "action": "invoke_tool", "data": {}}),
    )
    .await;
    assert_eq!(code, -32002);

    rpc_call(port, "bind_outbox", json!({"id": id})).await.unwrap();
    rpc_call(
        port,
        "write_session",
        json!({"id": id, "event": "backwards_response", "action": "invoke_tool", "data": {"ok": true}}),
    )
    .await
    .unwrap();

    let drained = rpc_call(port, "drain_outbox", json!({"id": id})).await.unwrap();
    let frames = drained["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(
        frames[0]["payload"],
        json!({
            "session_id": id,
            "conversation_id": null,
            "message_id": "msg-1",
            "app_id": null,
            "endpoint_id": null,
            "event": "backwards_response",
            "data": {"ok": true}
        })
    );

    let again = rpc_call(port, "drain_outbox", json!({"id": id})).await.unwrap();
    assert!(again["frames"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_peer_host_sees_detached_session() {
    let (_temp, cache) = shared_cache();
    let owner = spawn_server(cache.clone(), "a").await;
    let peer = spawn_server(cache, "b").await;

    let id = create(owner, json!({"tenant_id": "t1"})).await;

    let snapshot = rpc_call(peer, "get_session", json!({"id": id})).await.unwrap();
    assert_eq!(snapshot["detached"], true);
    assert_eq!(snapshot["session"]["cluster_id"], "a");

    assert_eq!(error_code(peer, "bind_outbox", json!({"id": id})).await, -32002);

    let ignored = rpc_call(peer, "get_session", json!({"id": id, "ignore_cache": true}))
        .await
        .unwrap();
    assert!(ignored["session"].is_null());

    rpc_call(owner, "delete_session", json!({"id": id})).await.unwrap();
    let gone = rpc_call(peer, "get_session", json!({"id": id})).await.unwrap();
    assert!(gone["session"].is_null());
}

#[tokio::test]
async fn test_cache_stats_track_mirroring() {
    let (_temp, cache) = shared_cache();
    let port = spawn_server(cache, "a").await;

    create(port, json!({})).await;
    create(port, json!({"ignore_cache": true})).await;

    let stats = rpc_call(port, "cache_stats", json!({})).await.unwrap();
    assert_eq!(stats["stats"]["mirrored"], 1);
    assert_eq!(stats["stats"]["mirror_failures"], 0);
}

#[tokio::test]
async fn test_error_codes() {
    let (_temp, cache) = shared_cache();
    let port = spawn_server(cache, "a").await;

    assert_eq!(error_code(port, "bind_outbox", json!({"id": "missing"})).await, -32001);
    assert_eq!(error_code(port, "get_session", json!({})).await, -32602);
    assert_eq!(
        error_code(port, "create_session", json!({"plugin_unique_identifier": "bad"})).await,
        -32005
    );
    assert_eq!(error_code(port, "no_such_method", json!({})).await, -32601);
}
