//! In-memory fakes shared by unit tests.

use crate::infrastructure::llm::{ChatModel, ChatRequest, ChatResponse, LlmError};
use crate::infrastructure::mcp::{McpError, ToolCallResult, ToolDescriptor, ToolServerInterface};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub server: String,
    pub tool: String,
    pub arguments: Value,
}

/// Tool server answering from a fixed table keyed by tool name.
#[derive(Default)]
pub struct StubTools {
    tools: Vec<ToolDescriptor>,
    responses: HashMap<String, ToolCallResult>,
    failing: HashMap<String, String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: &str, description: &str) -> Self {
        self.tools.push(ToolDescriptor {
            name: name.to_string(),
            description: Some(description.to_string()),
            server: None,
            input_schema: None,
        });
        self
    }

    pub fn respond(mut self, tool: &str, result: ToolCallResult) -> Self {
        self.responses.insert(tool.to_string(), result);
        self
    }

    pub fn respond_json(self, tool: &str, value: Value) -> Self {
        self.respond(tool, ToolCallResult::text(value.to_string()))
    }

    pub fn fail(mut self, tool: &str, reason: &str) -> Self {
        self.failing.insert(tool.to_string(), reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolServerInterface for StubTools {
    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, McpError> {
        Ok(self
            .tools
            .iter()
            .cloned()
            .map(|mut tool| {
                tool.server = Some(server.to_string());
                tool
            })
            .collect())
    }

    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                server: server.to_string(),
                tool: tool.to_string(),
                arguments,
            });
        }
        if let Some(reason) = self.failing.get(tool) {
            return Err(McpError::invalid_response(server, reason.clone()));
        }
        Ok(self
            .responses
            .get(tool)
            .cloned()
            .unwrap_or_else(|| ToolCallResult::error(format!("unknown tool {tool}"))))
    }
}

/// Chat model replaying scripted replies in order; repeats `fallback` once drained.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    fallback: String,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|reply| Ok(reply.into())).collect()),
            fallback: "ok".to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        let model = Self::new(Vec::<String>::new());
        model.push_error("model offline");
        model
    }

    pub fn with_fallback(mut self, fallback: &str) -> Self {
        self.fallback = fallback.to_string();
        self
    }

    pub fn push_error(&self, reason: &str) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(reason.to_string()));
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        match next {
            Ok(content) => Ok(ChatResponse {
                content,
                model: "scripted".to_string(),
            }),
            Err(reason) => Err(LlmError::invalid_response(reason)),
        }
    }
}
