//! LLM request, response and error types

use crate::domain::ChatMessage;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use thiserror::Error;

/// One chat call. Every `Option` left unset falls back to the client configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub url: Option<String>,
    pub token: Option<String>,
    /// Merged last, over configured and environment headers.
    pub headers: BTreeMap<String, String>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Optional system prompt followed by a single user message.
    pub fn prompt(system: Option<&str>, user: impl Into<String>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system.filter(|s| !s.trim().is_empty()) {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(user));
        Self::new(messages)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM endpoint is not configured")]
    MissingUrl,
    #[error("network error calling LLM endpoint: {source}")]
    Network {
        #[source]
        source: reqwest::Error,
    },
    #[error("LLM request timed out")]
    Timeout,
    #[error("LLM endpoint responded with HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("LLM endpoint returned invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl LlmError {
    pub fn network(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout
        } else {
            Self::Network { source }
        }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            LlmError::MissingUrl => "LLM endpoint is not configured. Set llm.url or LLM_URL.".to_string(),
            LlmError::Network { source } => {
                if source.is_connect() {
                    "Cannot connect to the LLM endpoint.".to_string()
                } else {
                    "Network error while calling the LLM endpoint.".to_string()
                }
            }
            LlmError::Timeout => "The LLM endpoint did not answer in time.".to_string(),
            LlmError::Status { status, .. } => match *status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    "The LLM endpoint rejected the credentials.".to_string()
                }
                StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                    "The LLM endpoint is temporarily unavailable.".to_string()
                }
                other => format!("LLM request failed with HTTP {}.", other.as_u16()),
            },
            LlmError::InvalidResponse { .. } => {
                "The LLM endpoint returned a response without choices.".to_string()
            }
        }
    }
}
