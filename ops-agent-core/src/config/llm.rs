use super::duration::parse_duration;
use super::error::ConfigError;
use crate::constants::{DEFAULT_LLM_MODEL, DEFAULT_LLM_PROVIDER, DEFAULT_LLM_TIMEOUT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Request/response shape spoken by the chat endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiFormat {
    /// Internal gateway: `base_llm_arguments` body, answer in `choices[0].text`.
    #[default]
    Gateway,
    /// OpenAI-compatible `/chat/completions`.
    OpenAi,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmConfig {
    pub url: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub model: String,
    pub provider: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
    pub api_format: ApiFormat,
    #[serde(skip_serializing)]
    pub headers: BTreeMap<String, String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            provider: DEFAULT_LLM_PROVIDER.to_string(),
            temperature: 0.0,
            max_tokens: None,
            timeout: Duration::from_secs(60),
            api_format: ApiFormat::default(),
            headers: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    /// Endpoint URL, failing when neither file nor environment provided one.
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingLlmUrl)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawLlmConfig {
    #[serde(default, alias = "api_host")]
    pub url: Option<String>,
    #[serde(default, alias = "api_key")]
    pub token: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub api_format: Option<ApiFormat>,
    #[serde(default)]
    pub headers_json: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RawLlmConfig {
    pub(crate) fn build(self) -> Result<LlmConfig, ConfigError> {
        let mut headers = self.headers;
        if let Some(json) = self.headers_json.as_deref() {
            headers.extend(parse_headers(json, "llm.headers_json")?);
        }
        Ok(LlmConfig {
            url: self.url,
            token: self.token.filter(|token| !token.is_empty()),
            model: self.model.unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            provider: self
                .provider
                .unwrap_or_else(|| DEFAULT_LLM_PROVIDER.to_string()),
            temperature: self.temperature.unwrap_or(0.0),
            max_tokens: self.max_tokens,
            timeout: parse_duration(self.timeout.as_deref().unwrap_or(DEFAULT_LLM_TIMEOUT))?,
            api_format: self.api_format.unwrap_or_default(),
            headers,
        })
    }
}

/// Parse a JSON object of header names to values. Non-string values are stringified.
pub(crate) fn parse_headers(json: &str, source: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnv {
        var: source.to_string(),
        reason,
    };
    let value: Value = serde_json::from_str(json).map_err(|err| invalid(err.to_string()))?;
    let Value::Object(map) = value else {
        return Err(invalid("expected a JSON object".into()));
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
