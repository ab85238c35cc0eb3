use crate::config::ConfigError;
use thiserror::Error;

/// Failures that stop the agent before any task runs.
///
/// Problems inside the loop (planning, tool calls, evaluation) are recorded on
/// the task report instead.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to load task file: {0}")]
    TaskFile(#[source] ConfigError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no tasks to run")]
    NoTasks,
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::TaskFile(err) => format!("Could not read the task file: {err}"),
            AgentError::Config(err) => err.user_message(),
            AgentError::NoTasks => {
                "No tasks defined. Add entries under `tasks:` in the task file.".to_string()
            }
        }
    }
}
