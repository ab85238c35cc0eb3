use ops_agent_core::application::agent::AgentError;
use ops_agent_core::application::anomaly::AnomalyError;
use ops_agent_core::mcp::McpError;
use ops_agent_core::server::ServerError;
use ops_agent_core::{ConfigError, OrchestratorError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Anomaly(#[from] AnomalyError),
    #[error(transparent)]
    Mcp(#[from] McpError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("invalid --{flag} value: {reason}")]
    InvalidJson { flag: &'static str, reason: String },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn user_message(&self) -> String {
        match self {
            CliError::Config(err) => err.user_message(),
            CliError::Agent(err) => err.user_message(),
            CliError::Orchestrator(err) => err.user_message(),
            CliError::Anomaly(err) => err.user_message(),
            CliError::Mcp(err) => err.user_message(),
            CliError::Server(err) => err.user_message(),
            CliError::InvalidJson { flag, .. } => {
                format!("--{flag} must be a JSON object, e.g. '{{\"service_name\":\"checkout\"}}'")
            }
            CliError::Write { path, .. } => format!("Could not write results to {}.", path.display()),
        }
    }
}
