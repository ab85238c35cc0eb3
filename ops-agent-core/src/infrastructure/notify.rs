//! Markdown webhook notifications (group-chat robots keyed by `key=`).

use crate::config::NotifyConfig;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification webhook URL is not configured")]
    MissingUrl,
    #[error("notification request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("webhook responded with HTTP {status}")]
    Status { status: u16 },
    #[error("webhook rejected the message: errcode {code}, {message}")]
    Rejected { code: i64, message: String },
}

#[derive(Clone)]
pub struct WebhookNotifier {
    config: NotifyConfig,
    http: Client,
}

impl WebhookNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    /// Post `content` as markdown. An explicit `key` wins over the configured one.
    pub async fn send_markdown(&self, content: &str, key: Option<&str>) -> Result<Value, NotifyError> {
        let base = self
            .config
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(NotifyError::MissingUrl)?;
        let key = key.or(self.config.key.as_deref()).filter(|k| !k.is_empty());
        let url = match key {
            Some(key) => apply_webhook_key(base, key),
            None => base.to_string(),
        };
        let payload = json!({
            "msgtype": "markdown",
            "markdown": { "text": content },
        });

        info!(chars = content.chars().count(), "Sending webhook notification");
        let response = self
            .http
            .post(&url)
            .timeout(NOTIFY_TIMEOUT)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Webhook returned error status");
            return Err(NotifyError::Status {
                status: status.as_u16(),
            });
        }
        let body: Value = response.json().await.unwrap_or(Value::Null);
        match body.get("errcode").and_then(Value::as_i64) {
            Some(0) | None => Ok(body),
            Some(code) => Err(NotifyError::Rejected {
                code,
                message: body
                    .get("errmsg")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
        }
    }
}

/// Insert the webhook key into `url`.
///
/// An existing `key=` value is replaced, then a `{key}` placeholder, then a dangling
/// `?key=`/`&key=` suffix is completed; otherwise the parameter is appended.
pub fn apply_webhook_key(url: &str, key: &str) -> String {
    if url.ends_with("?key=") || url.ends_with("&key=") {
        return format!("{url}{key}");
    }
    if let Some(position) = find_key_param(url) {
        let value_start = position + "key=".len();
        let value_end = url[value_start..]
            .find('&')
            .map(|offset| value_start + offset)
            .unwrap_or(url.len());
        return format!("{}{}{}", &url[..value_start], key, &url[value_end..]);
    }
    if url.contains("{key}") {
        return url.replace("{key}", key);
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}key={key}")
}

fn find_key_param(url: &str) -> Option<usize> {
    ["?key=", "&key="]
        .iter()
        .filter_map(|pattern| url.find(pattern).map(|index| index + 1))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_key_value() {
        assert_eq!(
            apply_webhook_key("https://hook/send?key=old&x=1", "new"),
            "https://hook/send?key=new&x=1"
        );
    }

    #[test]
    fn fills_placeholder_and_dangling_parameter() {
        assert_eq!(apply_webhook_key("https://hook/{key}/send", "abc"), "https://hook/abc/send");
        assert_eq!(apply_webhook_key("https://hook/send?key=", "abc"), "https://hook/send?key=abc");
        assert_eq!(apply_webhook_key("https://hook/send?a=1&key=", "abc"), "https://hook/send?a=1&key=abc");
    }

    #[test]
    fn appends_parameter_with_right_separator() {
        assert_eq!(apply_webhook_key("https://hook/send", "k"), "https://hook/send?key=k");
        assert_eq!(apply_webhook_key("https://hook/send?a=1", "k"), "https://hook/send?a=1&key=k");
    }
}
