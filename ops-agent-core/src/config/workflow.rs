use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Guard evaluated against the shared context before a step runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepCondition {
    ContextKeyExists { key: String },
    ContextValueEquals { key: String, value: Value },
    ModuleSucceeded { module: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub module: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub condition: Option<StepCondition>,
    /// Module whose stored data is merged into `params` before execution.
    #[serde(default)]
    pub use_result_from: Option<String>,
    #[serde(default)]
    pub stop_on_failure: bool,
}

impl WorkflowStep {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            params: Map::new(),
            condition: None,
            use_result_from: None,
            stop_on_failure: false,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_condition(mut self, condition: StepCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn using_result_from(mut self, module: impl Into<String>) -> Self {
        self.use_result_from = Some(module.into());
        self
    }

    pub fn stop_on_failure(mut self) -> Self {
        self.stop_on_failure = true;
        self
    }
}
