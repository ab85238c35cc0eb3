use crate::infrastructure::llm::LlmError;
use crate::infrastructure::mcp::McpError;
use crate::infrastructure::notify::NotifyError;
use thiserror::Error;

/// Failure raised inside a check module.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error(transparent)]
    Mcp(#[from] McpError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("{0}")]
    Execution(String),
}

impl ModuleError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn user_message(&self) -> String {
        match self {
            ModuleError::InvalidParams(reason) => format!("Invalid module parameters: {reason}"),
            ModuleError::Mcp(err) => err.user_message(),
            ModuleError::Llm(err) => err.user_message(),
            ModuleError::Notify(err) => format!("Notification failed: {err}"),
            ModuleError::Execution(reason) => reason.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("module '{name}' is not registered")]
    ModuleNotFound { name: String },
}

impl OrchestratorError {
    pub fn user_message(&self) -> String {
        match self {
            OrchestratorError::ModuleNotFound { name } => {
                format!("Unknown module '{name}'. Run `ops-agent module --help` to see registered modules.")
            }
        }
    }
}
