//! HTTP chat client for the LLM gateway or any OpenAI-compatible endpoint

use super::traits::ChatModel;
use super::types::{ChatRequest, ChatResponse, LlmError};
use crate::config::{ApiFormat, LlmConfig};
use crate::constants::GATEWAY_API_VERSION;
use crate::domain::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Clone)]
pub struct LlmClient {
    config: LlmConfig,
    http: Client,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Configured headers (file, then `LLM_HEADERS_JSON`) overlaid with per-call headers.
    fn resolve_headers(&self, request: &ChatRequest) -> BTreeMap<String, String> {
        let mut headers = self.config.headers.clone();
        headers.extend(request.headers.clone());
        headers
    }

    fn build_body(&self, request: &ChatRequest, model: &str) -> Result<Value, LlmError> {
        let temperature = request.temperature.unwrap_or(self.config.temperature);
        let max_tokens = request.max_tokens.or(self.config.max_tokens);
        let body = match self.config.api_format {
            ApiFormat::Gateway => serde_json::to_value(GatewayRequest {
                stream: false,
                provider: &self.config.provider,
                model,
                messages: &request.messages,
                base_llm_arguments: BaseArguments {
                    temperature,
                    max_tokens,
                },
                extended_llm_arguments: Map::new(),
                context: Map::new(),
                examples: Vec::new(),
                version: GATEWAY_API_VERSION,
            }),
            ApiFormat::OpenAi => serde_json::to_value(OpenAiRequest {
                model,
                messages: &request.messages,
                temperature,
                max_tokens,
                stream: false,
            }),
        };
        body.map_err(|err| LlmError::invalid_response(err.to_string()))
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = request
            .url
            .clone()
            .or_else(|| self.config.url.clone())
            .filter(|url| !url.trim().is_empty())
            .ok_or(LlmError::MissingUrl)?;
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());
        let body = self.build_body(&request, &model)?;

        info!(
            model = model.as_str(),
            format = ?self.config.api_format,
            messages = request.messages.len(),
            "Sending request to LLM endpoint"
        );

        let mut builder = self.http.post(&url).timeout(self.config.timeout).json(&body);
        if let Some(token) = request
            .token
            .as_deref()
            .or(self.config.token.as_deref())
            .filter(|token| !token.trim().is_empty())
        {
            builder = builder.bearer_auth(token);
        }
        for (name, value) in self.resolve_headers(&request) {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(LlmError::network)?;
        let status = response.status();
        let text = response.text().await.map_err(LlmError::network)?;
        if !status.is_success() {
            return Err(LlmError::Status {
                status,
                body: text.chars().take(500).collect(),
            });
        }
        let parsed: Value = serde_json::from_str(&text)
            .map_err(|err| LlmError::invalid_response(format!("body is not JSON: {err}")))?;
        debug!("Received response from LLM endpoint");

        let content = extract_content(&parsed)
            .ok_or_else(|| LlmError::invalid_response("response contains no choices"))?;
        Ok(ChatResponse { content, model })
    }
}

/// Gateway answers in `choices[0].text`; OpenAI-style in `choices[0].message.content`.
fn extract_content(response: &Value) -> Option<String> {
    let choice = response.get("choices")?.as_array()?.first()?;
    choice
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| {
            choice
                .get("message")
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
}

#[derive(Serialize)]
struct GatewayRequest<'a> {
    stream: bool,
    provider: &'a str,
    model: &'a str,
    messages: &'a [ChatMessage],
    base_llm_arguments: BaseArguments,
    extended_llm_arguments: Map<String, Value>,
    context: Map<String, Value>,
    examples: Vec<Value>,
    version: &'static str,
}

#[derive(Serialize)]
struct BaseArguments {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}
