use crate::config::TaskSpec;
use crate::constants::DEFAULT_MAX_ITERATIONS;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One tool invocation proposed by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCall {
    pub tool: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

fn empty_arguments() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub steps: Vec<PlannedCall>,
    /// Why the plan is empty, when the planner reply was unusable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Plan {
    pub fn empty(note: impl Into<String>) -> Self {
        Self {
            steps: Vec::new(),
            note: Some(note.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub tool: String,
    pub server: String,
    pub arguments: Value,
    pub success: bool,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub iteration: usize,
    pub plan: Plan,
    pub observations: Vec<Observation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub satisfied: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The evaluator accepted the observations.
    Completed,
    /// The iteration cap was reached without satisfaction.
    Exhausted,
    /// The loop could not start, e.g. tool discovery failed.
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Completed => "completed",
            TaskStatus::Exhausted => "exhausted",
            TaskStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task_name: String,
    pub description: String,
    pub intent: String,
    pub status: TaskStatus,
    pub iterations: usize,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: Vec<Attempt>,
}

impl TaskReport {
    pub(crate) fn failed(name: &str, task: &TaskSpec, error: String) -> Self {
        Self {
            task_name: name.to_string(),
            description: task.description.clone(),
            intent: task.intent.clone(),
            status: TaskStatus::Failed,
            iterations: 0,
            summary: format!("# Task report: {name}\n\nTask could not start: {error}"),
            evaluation: None,
            error: Some(error),
            attempts: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Observations of the final attempt.
    pub fn last_observations(&self) -> &[Observation] {
        self.attempts
            .last()
            .map(|attempt| attempt.observations.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub max_iterations: usize,
    /// MCP server used for discovery and for planned calls without a server.
    pub server: String,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            server: crate::constants::DEFAULT_SERVER_ALIAS.to_string(),
        }
    }
}
