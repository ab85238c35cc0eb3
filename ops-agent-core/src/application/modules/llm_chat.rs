use super::params::{bool_param, str_param};
use crate::application::orchestrator::{CheckModule, ModuleError};
use crate::domain::{ChatMessage, MessageRole, ModuleResult, Params, SharedContext};
use crate::infrastructure::llm::{ChatModel, ChatRequest};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

pub const LLM_CHAT: &str = "llm_chat";
const DEFAULT_HISTORY_KEY: &str = "llm_history";

/// Free-form chat with the configured LLM, optionally keeping history in the context.
pub struct LlmChatModule {
    llm: Arc<dyn ChatModel>,
}

impl LlmChatModule {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CheckModule for LlmChatModule {
    fn name(&self) -> &str {
        LLM_CHAT
    }

    fn description(&self) -> &str {
        "Chat with the LLM (input or messages)"
    }

    fn validate_params(&self, params: &Params, _context: &SharedContext) -> Result<(), String> {
        if params.contains_key("input") || params.contains_key("messages") {
            Ok(())
        } else {
            Err("either 'input' or 'messages' parameter is required".into())
        }
    }

    async fn execute(
        &self,
        params: Params,
        context: &mut SharedContext,
    ) -> Result<ModuleResult, ModuleError> {
        let input = str_param(&params, "input").map(str::to_string);
        let use_context = bool_param(&params, "use_context", false);
        let history_key = str_param(&params, "context_key")
            .unwrap_or(DEFAULT_HISTORY_KEY)
            .to_string();

        let mut history = params
            .get("history")
            .map(parse_messages)
            .unwrap_or_default();
        if use_context {
            if let Some(stored) = context.get(&history_key).map(parse_messages) {
                if !stored.is_empty() {
                    history = stored;
                }
            }
        }

        let messages = match params.get("messages").map(parse_messages) {
            Some(messages) if !messages.is_empty() => messages,
            _ => {
                let mut messages = Vec::with_capacity(history.len() + 2);
                if let Some(system) = str_param(&params, "system_prompt").or_else(|| str_param(&params, "prompt")) {
                    messages.push(ChatMessage::system(system));
                }
                messages.extend(history.iter().cloned());
                if let Some(input) = &input {
                    messages.push(ChatMessage::user(input.clone()));
                }
                messages
            }
        };
        if messages.is_empty() {
            return Err(ModuleError::InvalidParams("no messages to send".into()));
        }

        let request = build_request(&params, messages.clone());
        info!(messages = messages.len(), "Sending LLM chat request");
        let response = self.llm.chat(request).await?;

        if use_context {
            history.push(ChatMessage::user(input.unwrap_or_default()));
            history.push(ChatMessage::assistant(response.content.clone()));
            context.set(history_key, json!(history));
        }

        let mut data = Params::new();
        data.insert("response".into(), json!(response.content));
        data.insert("model".into(), json!(response.model));
        Ok(ModuleResult::success(LLM_CHAT, data).with_metadata("message_count", messages.len()))
    }
}

fn build_request(params: &Params, messages: Vec<ChatMessage>) -> ChatRequest {
    let mut request = ChatRequest::new(messages);
    if let Some(model) = str_param(params, "model") {
        request = request.with_model(model);
    }
    if let Some(temperature) = params.get("temperature").and_then(Value::as_f64) {
        request = request.with_temperature(temperature as f32);
    }
    if let Some(max_tokens) = params.get("max_tokens").and_then(Value::as_u64) {
        request = request.with_max_tokens(max_tokens as u32);
    }
    if let Some(url) = str_param(params, "url") {
        request = request.with_url(url);
    }
    if let Some(token) = str_param(params, "token") {
        request = request.with_token(token);
    }
    if let Some(Value::Object(headers)) = params.get("headers") {
        for (name, value) in headers {
            if let Some(value) = value.as_str() {
                request = request.with_header(name.clone(), value);
            }
        }
    }
    request
}

/// Accepts `{role, content}` objects or bare strings (treated as user turns).
fn parse_messages(value: &Value) -> Vec<ChatMessage> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(ChatMessage::user(text.clone())),
            Value::Object(object) => {
                let content = object.get("content").and_then(Value::as_str).unwrap_or_default();
                let role = match object.get("role").and_then(Value::as_str) {
                    Some("system") => MessageRole::System,
                    Some("assistant") => MessageRole::Assistant,
                    _ => MessageRole::User,
                };
                Some(ChatMessage::new(role, content))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn builds_messages_from_prompt_and_input() {
        let model = Arc::new(ScriptedModel::new(["pong"]));
        let module = LlmChatModule::new(model.clone());
        let result = module
            .execute(
                params(json!({
                    "input": "ping",
                    "system_prompt": "be brief",
                    "temperature": 0.5,
                    "headers": {"X-Team": "ops"}
                })),
                &mut SharedContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.data["response"], json!("pong"));
        let request = &model.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, MessageRole::System);
        assert_eq!(request.temperature, Some(0.5));
        assert_eq!(request.headers.get("X-Team").map(String::as_str), Some("ops"));
    }

    #[tokio::test]
    async fn keeps_history_in_context_when_asked() {
        let model = Arc::new(ScriptedModel::new(["first answer", "second answer"]));
        let module = LlmChatModule::new(model.clone());
        let mut context = SharedContext::new();

        for input in ["one", "two"] {
            module
                .execute(params(json!({"input": input, "use_context": true})), &mut context)
                .await
                .unwrap();
        }

        let history = context.get(DEFAULT_HISTORY_KEY).unwrap().as_array().unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[3]["content"], json!("second answer"));
        assert_eq!(model.requests()[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn llm_errors_propagate() {
        let module = LlmChatModule::new(Arc::new(ScriptedModel::failing()));
        let err = module
            .execute(params(json!({"input": "hi"})), &mut SharedContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ModuleError::Llm(_)));
    }
}
