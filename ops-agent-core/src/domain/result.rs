//! Outcome of a single module invocation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters handed to a module and the payload it produces.
pub type Params = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    Success,
    Failure,
    Skipped,
    /// Some data was collected but part of the work failed.
    Partial,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Success => "success",
            ModuleStatus::Failure => "failure",
            ModuleStatus::Skipped => "skipped",
            ModuleStatus::Partial => "partial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleResult {
    pub module_name: String,
    pub status: ModuleStatus,
    #[serde(default)]
    pub data: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Params,
}

impl ModuleResult {
    pub fn success(module_name: impl Into<String>, data: Params) -> Self {
        Self {
            module_name: module_name.into(),
            status: ModuleStatus::Success,
            data,
            error: None,
            metadata: Params::new(),
        }
    }

    pub fn failure(module_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            status: ModuleStatus::Failure,
            data: Params::new(),
            error: Some(error.into()),
            metadata: Params::new(),
        }
    }

    pub fn skipped(module_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut metadata = Params::new();
        metadata.insert("reason".into(), Value::String(reason.into()));
        Self {
            module_name: module_name.into(),
            status: ModuleStatus::Skipped,
            data: Params::new(),
            error: None,
            metadata,
        }
    }

    pub fn partial(module_name: impl Into<String>, data: Params, error: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            status: ModuleStatus::Partial,
            data,
            error: Some(error.into()),
            metadata: Params::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ModuleStatus::Success
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
