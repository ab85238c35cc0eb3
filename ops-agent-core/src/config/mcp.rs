use super::duration::parse_duration;
use super::error::ConfigError;
use crate::constants::DEFAULT_MCP_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpServerConfig {
    pub name: String,
    pub server_url: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub timeout: Duration,
    pub is_default: bool,
}

/// Entry as written in YAML or `MCP_SERVERS_JSON`; every field but `name` may be omitted
/// so that an environment entry can override single fields of a file entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RawMcpServer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub default: Option<bool>,
}

impl RawMcpServer {
    /// Overlay the fields present in `other` on top of `self`.
    pub(crate) fn overlay(&mut self, other: RawMcpServer) {
        if other.server_url.is_some() {
            self.server_url = other.server_url;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.timeout.is_some() {
            self.timeout = other.timeout;
        }
        if other.default.is_some() {
            self.default = other.default;
        }
    }
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl TryFrom<RawMcpServer> for McpServerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawMcpServer) -> Result<Self, Self::Error> {
        let name = raw.name.unwrap_or_default();
        let server_url = raw
            .server_url
            .map(|url| expand(&url))
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingServerUrl {
                server: name.clone(),
            })?;
        let timeout = parse_duration(raw.timeout.as_deref().unwrap_or(DEFAULT_MCP_TIMEOUT))?;
        Ok(Self {
            name,
            server_url,
            token: raw
                .token
                .map(|token| expand(&token))
                .filter(|token| !token.is_empty()),
            timeout,
            is_default: raw.default.unwrap_or(false),
        })
    }
}

/// Merge environment-provided servers into the file list, matching on name.
pub(crate) fn merge_servers(file: Vec<RawMcpServer>, env: Vec<RawMcpServer>) -> Vec<RawMcpServer> {
    let mut merged = file;
    for mut entry in env {
        if entry.name.is_none() {
            entry.name = Some(format!("MCP{}", merged.len() + 1));
        }
        match merged.iter_mut().find(|existing| existing.name == entry.name) {
            Some(existing) => existing.overlay(entry),
            None => merged.push(entry),
        }
    }
    merged
}
