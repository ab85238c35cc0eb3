use super::error::ConfigError;
use super::llm::LlmConfig;
use super::loader;
use super::mcp::McpServerConfig;
use super::settings::{AgentSettings, HttpConfig, NotifyConfig, QuerySettings, QuerySpec};
use super::workflow::WorkflowStep;
use crate::constants::DEFAULT_SERVER_ALIAS;
use std::path::Path;

/// Fully resolved configuration: file values with environment overrides applied.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub mcp_servers: Vec<McpServerConfig>,
    pub llm: LlmConfig,
    pub query: QuerySettings,
    pub queries: Vec<QuerySpec>,
    pub workflow: Vec<WorkflowStep>,
    pub notify: NotifyConfig,
    pub server: HttpConfig,
    pub agent: AgentSettings,
}

impl AppConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing explicit file is an error; a missing default file yields an
    /// environment-only configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        loader::load_config(path)
    }

    /// Parse YAML content, applying overrides from the process environment.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Self::from_yaml_with_env(content, |key| std::env::var(key).ok())
    }

    /// Parse YAML content with an explicit environment lookup.
    pub fn from_yaml_with_env<F>(content: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        loader::parse_config(content, Path::new("<inline>"), &env)
    }

    /// The server flagged `default`, otherwise the first configured one.
    pub fn default_mcp_server(&self) -> Option<&McpServerConfig> {
        self.mcp_servers
            .iter()
            .find(|server| server.is_default)
            .or_else(|| self.mcp_servers.first())
    }

    /// Look up a server by name. `default` and unknown names resolve to the default server.
    pub fn mcp_server(&self, name: &str) -> Option<&McpServerConfig> {
        if name != DEFAULT_SERVER_ALIAS {
            if let Some(server) = self.mcp_servers.iter().find(|server| server.name == name) {
                return Some(server);
            }
        }
        self.default_mcp_server()
    }

    /// Fails with [`ConfigError::NoServersConfigured`] when MCP is required but absent.
    pub fn require_mcp_servers(&self) -> Result<&[McpServerConfig], ConfigError> {
        if self.mcp_servers.is_empty() {
            Err(ConfigError::NoServersConfigured)
        } else {
            Ok(&self.mcp_servers)
        }
    }
}
