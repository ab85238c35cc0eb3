use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_bw::Error,
    },

    #[error("environment variable {var} is invalid: {reason}")]
    InvalidEnv { var: String, reason: String },

    #[error("invalid duration '{value}', expected a number followed by s, m, h or d")]
    InvalidDuration { value: String },

    #[error("MCP server '{server}' is missing required field 'server_url'")]
    MissingServerUrl { server: String },

    #[error("no MCP servers configured - add an mcp_servers entry or set MCP_SERVERS_JSON")]
    NoServersConfigured,

    #[error("LLM endpoint is not configured - set llm.url or LLM_URL")]
    MissingLlmUrl,

    #[error("nothing to run - no workflow steps or queries configured")]
    NothingToRun,

    #[error("invalid listen address '{value}'")]
    InvalidAddress { value: String },

    #[error("failed to parse task file {path:?}: {source}")]
    TaskFile {
        path: PathBuf,
        #[source]
        source: serde_yaml_bw::Error,
    },
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::NotFound { path } => {
                format!("Config file {} does not exist. Pass --config or create it.", path.display())
            }
            ConfigError::Parse { path, .. } | ConfigError::TaskFile { path, .. } => {
                format!("{} is not valid YAML: {self}", path.display())
            }
            ConfigError::InvalidEnv { var, .. } => format!("Fix the {var} environment variable: {self}"),
            ConfigError::NothingToRun => {
                "Nothing to run. Add a workflow or queries section to the config file.".to_string()
            }
            _ => self.to_string(),
        }
    }
}
