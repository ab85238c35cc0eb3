// Shared fixtures for the integration tests: a scripted MCP server on wiremock.
#![allow(dead_code)]

use ops_agent_core::config::McpServerConfig;
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_ID: &str = "session-1";

pub fn rpc_result(result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": 1, "result": result })
}

/// `tools/call` result carrying `payload` as a single JSON text block.
pub fn text_result(payload: &Value) -> Value {
    rpc_result(json!({
        "content": [{ "type": "text", "text": payload.to_string() }],
        "isError": false
    }))
}

/// A mock MCP server that accepts the initialize handshake.
pub async fn start_mcp() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "initialize" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("mcp-session-id", SESSION_ID)
                .set_body_json(rpc_result(json!({
                    "protocolVersion": "2025-06-18",
                    "capabilities": { "tools": {} },
                    "instructions": "ops tools"
                }))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "notifications/initialized" })))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;
    server
}

pub async fn mount_tool(server: &MockServer, tool: &str, payload: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "tools/call",
            "params": { "name": tool }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_result(&payload)))
        .mount(server)
        .await;
}

pub async fn mount_tool_list(server: &MockServer, tools: Value) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "tools/list" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(rpc_result(json!({ "tools": tools }))))
        .mount(server)
        .await;
}

pub fn upstreams(count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| json!({ "upstream": format!("svc-{i}"), "status": "ok" }))
            .collect(),
    )
}

pub fn error_hits(count: usize) -> Value {
    let hits: Vec<Value> = (0..count)
        .map(|i| {
            let level = if i % 4 == 0 { "fatal" } else { "error" };
            json!({ "_source": { "level": level, "message": format!("boom {i}") } })
        })
        .collect();
    json!({ "hits": { "total": { "value": count }, "hits": hits } })
}

/// Mount the two tools the ops workflow reads from.
pub async fn mount_ops_tools(server: &MockServer, upstream_count: usize, error_count: usize) {
    mount_tool(server, "get-events-from-ops", upstreams(upstream_count)).await;
    mount_tool(server, "search-logs-from-elasticsearch", error_hits(error_count)).await;
}

pub fn server_config(name: &str, url: &str) -> McpServerConfig {
    McpServerConfig {
        name: name.to_string(),
        server_url: url.to_string(),
        token: None,
        timeout: Duration::from_secs(5),
        is_default: false,
    }
}

/// Every JSON-RPC `tools/call` body the mock received, in order.
pub async fn tool_calls(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|request| serde_json::from_slice::<Value>(&request.body).ok())
        .filter(|body| body["method"] == "tools/call")
        .collect()
}
