use super::client::McpHttpClient;
use super::error::McpError;
use super::interface::{ToolCallResult, ToolDescriptor, ToolServerInterface};
use crate::config::{AppConfig, McpServerConfig};
use crate::constants::DEFAULT_SERVER_ALIAS;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Registry of configured MCP servers with lazily opened sessions.
///
/// Unknown server names fall back to the default server, mirroring [`AppConfig::mcp_server`].
pub struct ServerManager {
    configs: HashMap<String, McpServerConfig>,
    default_server: Option<String>,
    instances: Mutex<HashMap<String, Arc<McpHttpClient>>>,
}

impl ServerManager {
    pub fn new(configs: Vec<McpServerConfig>) -> Self {
        let default_server = configs
            .iter()
            .find(|cfg| cfg.is_default)
            .or_else(|| configs.first())
            .map(|cfg| cfg.name.clone());
        let configs = configs
            .into_iter()
            .map(|cfg| (cfg.name.clone(), cfg))
            .collect();
        Self {
            configs,
            default_server,
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.mcp_servers.clone())
    }

    pub fn server_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn default_server(&self) -> Option<&str> {
        self.default_server.as_deref()
    }

    fn resolve(&self, server: &str) -> Result<&McpServerConfig, McpError> {
        let direct = (server != DEFAULT_SERVER_ALIAS && !server.is_empty())
            .then(|| self.configs.get(server))
            .flatten();
        if let Some(config) = direct {
            return Ok(config);
        }
        let fallback = self
            .default_server
            .as_deref()
            .and_then(|name| self.configs.get(name));
        match fallback {
            Some(config) => {
                if server != DEFAULT_SERVER_ALIAS && server != config.name {
                    warn!(
                        requested = server,
                        using = %config.name,
                        "Unknown MCP server, falling back to default"
                    );
                }
                Ok(config)
            }
            None => Err(McpError::NotConfigured {
                server: server.to_string(),
            }),
        }
    }

    async fn ensure_client(&self, server: &str) -> Result<Arc<McpHttpClient>, McpError> {
        let config = self.resolve(server)?;
        let mut instances = self.instances.lock().await;
        if let Some(existing) = instances.get(&config.name) {
            return Ok(existing.clone());
        }
        debug!(server = %config.name, url = %config.server_url, "Opening MCP session");
        let client = Arc::new(McpHttpClient::new(config.clone()));
        instances.insert(config.name.clone(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl ToolServerInterface for ServerManager {
    async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, McpError> {
        let client = self.ensure_client(server).await?;
        client.list_tools().await
    }

    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, McpError> {
        let client = self.ensure_client(server).await?;
        info!(server = %client.server().name, tool, "Calling MCP tool");
        let result = client.call_tool(tool, arguments).await;
        match &result {
            Ok(outcome) => debug!(tool, is_error = outcome.is_error, "MCP tool returned"),
            Err(err) => warn!(tool, %err, "MCP tool call failed"),
        }
        result
    }
}
