//! JSON-RPC over HTTP session with a single MCP server.
//!
//! The session is initialized lazily on first use. Responses may arrive as plain
//! JSON or as a `text/event-stream` body carrying the JSON-RPC message in `data:`
//! lines; both are accepted.

use super::error::McpError;
use super::interface::{ToolCallResult, ToolDescriptor};
use crate::config::McpServerConfig;
use crate::constants::MCP_PROTOCOL_VERSION;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

const SESSION_HEADER: &str = "mcp-session-id";
const PROTOCOL_HEADER: &str = "mcp-protocol-version";

#[derive(Default)]
struct SessionState {
    initialized: bool,
    session_id: Option<String>,
    instructions: Option<String>,
}

pub struct McpHttpClient {
    server: McpServerConfig,
    http: Client,
    state: AsyncMutex<SessionState>,
    id_counter: AtomicU64,
}

impl McpHttpClient {
    pub fn new(server: McpServerConfig) -> Self {
        Self {
            server,
            http: Client::new(),
            state: AsyncMutex::new(SessionState::default()),
            id_counter: AtomicU64::new(1),
        }
    }

    pub fn server(&self) -> &McpServerConfig {
        &self.server
    }

    pub async fn instructions(&self) -> Option<String> {
        self.state.lock().await.instructions.clone()
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, McpError> {
        self.ensure_initialized().await?;
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match cursor.take() {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.send_request("tools/list", params).await?;
            let listing = result
                .get("tools")
                .and_then(Value::as_array)
                .ok_or_else(|| McpError::invalid_response(&self.server.name, "missing 'tools' array"))?;
            tools.extend(
                listing
                    .iter()
                    .filter_map(|tool| ToolDescriptor::from_listing(tool, &self.server.name)),
            );
            match result.get("nextCursor").and_then(Value::as_str) {
                Some(next) if !next.is_empty() => cursor = Some(next.to_string()),
                _ => break,
            }
        }
        info!(server = %self.server.name, count = tools.len(), "Fetched MCP tool catalogue");
        Ok(tools)
    }

    pub async fn call_tool(&self, tool: &str, arguments: Value) -> Result<ToolCallResult, McpError> {
        self.ensure_initialized().await?;
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        let result = self.send_request("tools/call", params).await?;
        Ok(ToolCallResult::from_value(result))
    }

    async fn ensure_initialized(&self) -> Result<(), McpError> {
        let mut state = self.state.lock().await;
        if state.initialized {
            return Ok(());
        }
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let (result, session_id) = self.post("initialize", Some(params), None).await?;
        let result = result.ok_or_else(|| {
            McpError::invalid_response(&self.server.name, "empty initialize response")
        })?;
        state.session_id = session_id;
        state.instructions = result
            .get("instructions")
            .and_then(Value::as_str)
            .map(str::to_string);
        self.post(
            "notifications/initialized",
            None,
            state.session_id.clone(),
        )
        .await?;
        state.initialized = true;
        debug!(
            server = %self.server.name,
            session = state.session_id.as_deref(),
            "MCP session initialized"
        );
        Ok(())
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let session_id = self.state.lock().await.session_id.clone();
        let (result, _) = self.post(method, Some(params), session_id).await?;
        result.ok_or_else(|| McpError::invalid_response(&self.server.name, "empty response body"))
    }

    /// POST one JSON-RPC message. `params: None` sends a notification, which carries no id
    /// and expects no result.
    async fn post(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<String>,
    ) -> Result<(Option<Value>, Option<String>), McpError> {
        let name = self.server.name.as_str();
        let is_notification = params.is_none();
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        let payload = match params {
            Some(params) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }),
            None => json!({ "jsonrpc": "2.0", "method": method }),
        };

        debug!(server = name, method, "Sending MCP request");
        let mut request = self
            .http
            .post(&self.server.server_url)
            .timeout(self.server.timeout)
            .header(ACCEPT, "application/json, text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .json(&payload);
        if let Some(token) = self.server.token.as_deref() {
            request = request.bearer_auth(token);
        }
        if let Some(session) = session_id.as_deref() {
            request = request
                .header(SESSION_HEADER, session)
                .header(PROTOCOL_HEADER, MCP_PROTOCOL_VERSION);
        }

        let response = request.send().await.map_err(|e| McpError::http(name, e))?;
        let status = response.status();
        let returned_session = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/event-stream"));
        let body = response.text().await.map_err(|e| McpError::http(name, e))?;

        if !status.is_success() {
            return Err(McpError::Status {
                server: name.to_string(),
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        if is_notification || body.trim().is_empty() {
            return Ok((None, returned_session));
        }

        let message = if is_stream {
            parse_event_stream(&body, id).ok_or_else(|| {
                McpError::invalid_response(name, "no JSON-RPC message in event stream")
            })?
        } else {
            serde_json::from_str::<Value>(&body)
                .map_err(|err| McpError::invalid_response(name, err.to_string()))?
        };

        if let Some(error) = message.get("error") {
            return Err(McpError::Rpc {
                server: name.to_string(),
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-1),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        Ok((
            Some(message.get("result").cloned().unwrap_or(Value::Null)),
            returned_session,
        ))
    }
}

/// Pick the JSON-RPC response with the matching id out of an SSE body.
fn parse_event_stream(body: &str, id: u64) -> Option<Value> {
    let mut fallback = None;
    for event in body.split("\n\n") {
        let data: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim_start)
            .collect();
        if data.is_empty() {
            continue;
        }
        let Ok(message) = serde_json::from_str::<Value>(&data.join("\n")) else {
            continue;
        };
        if message.get("id").and_then(Value::as_u64) == Some(id) {
            return Some(message);
        }
        if fallback.is_none() && (message.get("result").is_some() || message.get("error").is_some()) {
            fallback = Some(message);
        }
    }
    fallback
}
