use super::error::McpError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tool advertised by an MCP server through `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl ToolDescriptor {
    pub(crate) fn from_listing(tool: &Value, server: &str) -> Option<Self> {
        let name = tool.get("name").and_then(Value::as_str)?;
        Some(Self {
            name: name.to_string(),
            description: tool
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            server: Some(server.to_string()),
            input_schema: tool.get("inputSchema").cloned(),
        })
    }

    /// Names of the required parameters declared by the input schema.
    pub fn required_params(&self) -> Vec<String> {
        self.input_schema
            .as_ref()
            .and_then(|schema| schema.get("required"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Normalized `tools/call` result. Text blocks are flattened to strings; other
/// blocks are kept as JSON objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<Value>,
    #[serde(rename = "isError")]
    pub is_error: bool,
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
}

impl ToolCallResult {
    pub fn from_value(value: Value) -> Self {
        let content = value
            .get("content")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| match item.get("text").and_then(Value::as_str) {
                        Some(text) => Value::String(text.to_string()),
                        None => item.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            content,
            is_error: value
                .get("isError")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            structured: value.get("structuredContent").cloned(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![Value::String(content.into())],
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Value::String(message.into())],
            is_error: true,
            structured: None,
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(Value::as_str)
    }

    pub fn joined_text(&self) -> String {
        self.texts().collect::<Vec<_>>().join("\n")
    }

    /// Content items decoded as JSON where possible.
    pub fn json_items(&self) -> Vec<Value> {
        self.content
            .iter()
            .map(|item| match item {
                Value::String(text) => {
                    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
                }
                other => other.clone(),
            })
            .collect()
    }

    /// Human-readable error text, preferring structured error details.
    pub fn error_message(&self) -> Option<String> {
        if let Some(message) = self
            .structured
            .as_ref()
            .and_then(|value| value.get("error"))
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
        {
            return Some(message.to_string());
        }
        let joined = self.joined_text();
        (!joined.is_empty()).then_some(joined)
    }

    pub fn to_value(&self) -> Value {
        json!({
            "content": self.content,
            "isError": self.is_error,
        })
    }
}

#[async_trait]
pub trait ToolServerInterface: Send + Sync {
    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, McpError>;

    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_result_flattens_text_blocks() {
        let result = ToolCallResult::from_value(json!({
            "content": [
                {"type": "text", "text": "{\"name\":\"svc-a\"}"},
                {"type": "image", "data": "..."}
            ],
            "isError": false
        }));
        assert_eq!(result.content[0], json!("{\"name\":\"svc-a\"}"));
        assert_eq!(result.content[1]["type"], json!("image"));
        assert_eq!(result.json_items()[0]["name"], json!("svc-a"));
        assert!(!result.is_error);
    }

    #[test]
    fn error_message_prefers_structured_error() {
        let result = ToolCallResult::from_value(json!({
            "content": [{"type": "text", "text": "failed"}],
            "structuredContent": {"error": {"message": "index not found"}},
            "isError": true
        }));
        assert_eq!(result.error_message().as_deref(), Some("index not found"));
        assert_eq!(ToolCallResult::error("bad").error_message().as_deref(), Some("bad"));
    }

    #[test]
    fn descriptor_reads_required_params() {
        let tool = json!({
            "name": "search-logs",
            "description": "Search logs",
            "inputSchema": {"type": "object", "required": ["index", "body"]}
        });
        let descriptor = ToolDescriptor::from_listing(&tool, "logs").expect("descriptor");
        assert_eq!(descriptor.server.as_deref(), Some("logs"));
        assert_eq!(descriptor.required_params(), vec!["index", "body"]);
    }
}
