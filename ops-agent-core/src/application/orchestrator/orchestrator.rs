use super::errors::{ModuleError, OrchestratorError};
use super::module::CheckModule;
use crate::config::{StepCondition, WorkflowStep};
use crate::domain::{ModuleResult, ModuleStatus, Params, SharedContext};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub skipped: usize,
    pub partial: usize,
    pub success_rate: f64,
}

/// Registry of check modules plus the context and history of one run.
#[derive(Default)]
pub struct Orchestrator {
    modules: BTreeMap<String, Arc<dyn CheckModule>>,
    context: SharedContext,
    history: Vec<ModuleResult>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_module(&mut self, module: Arc<dyn CheckModule>) {
        let name = module.name().to_string();
        if self.modules.insert(name.clone(), module).is_some() {
            warn!(module = %name, "Replaced previously registered module");
        }
    }

    pub fn has_module(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    /// `(name, description)` of every registered module, sorted by name.
    pub fn describe_modules(&self) -> Vec<(String, String)> {
        self.modules
            .iter()
            .map(|(name, module)| (name.clone(), module.description().to_string()))
            .collect()
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SharedContext {
        &mut self.context
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.context.set(key, value);
    }

    pub fn get_context(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    pub fn clear_context(&mut self) {
        self.context.clear();
    }

    pub fn history(&self) -> &[ModuleResult] {
        &self.history
    }

    /// Run one module. Only an unknown name is an error; every other problem
    /// ends up as a failure result stored under `{name}_result`.
    pub async fn execute_module(
        &mut self,
        name: &str,
        params: Params,
    ) -> Result<ModuleResult, OrchestratorError> {
        let module = self
            .modules
            .get(name)
            .cloned()
            .ok_or_else(|| OrchestratorError::ModuleNotFound {
                name: name.to_string(),
            })?;

        info!(module = %name, "Executing module");
        let result = self.run_module(module.as_ref(), params).await;
        info!(
            module = %name,
            status = result.status.as_str(),
            error = result.error.as_deref(),
            "Module finished"
        );
        Ok(self.record(result))
    }

    async fn run_module(&mut self, module: &dyn CheckModule, params: Params) -> ModuleResult {
        let name = module.name().to_string();
        if let Err(reason) = module.validate_params(&params, &self.context) {
            warn!(module = %name, %reason, "Module rejected parameters");
            return ModuleResult::failure(&name, ModuleError::InvalidParams(reason).user_message());
        }

        let outcome = AssertUnwindSafe(module.execute(params, &mut self.context))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(mut result)) => {
                result.module_name = name;
                result
            }
            Ok(Err(err)) => {
                error!(module = %name, error = %err, "Module execution failed");
                ModuleResult::failure(&name, err.user_message())
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(module = %name, %reason, "Module panicked");
                ModuleResult::failure(&name, format!("module panicked: {reason}"))
            }
        }
    }

    fn record(&mut self, result: ModuleResult) -> ModuleResult {
        let name = result.module_name.clone();
        self.context.set(format!("{name}_result"), result.to_value());
        if matches!(result.status, ModuleStatus::Success | ModuleStatus::Partial) {
            self.context.set(name, Value::Object(result.data.clone()));
        }
        self.history.push(result.clone());
        result
    }

    /// Run steps in order, honouring conditions, result chaining and `stop_on_failure`.
    pub async fn execute_workflow(&mut self, steps: &[WorkflowStep]) -> Vec<ModuleResult> {
        let mut results = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let result = self.execute_step(step).await.with_metadata("step_index", index);
            let failed = result.status == ModuleStatus::Failure;
            results.push(result);
            if failed && step.stop_on_failure {
                warn!(module = %step.module, step = index, "Workflow stopped after failed step");
                break;
            }
        }
        results
    }

    async fn execute_step(&mut self, step: &WorkflowStep) -> ModuleResult {
        if let Some(condition) = &step.condition {
            if !self.condition_met(condition) {
                info!(module = %step.module, ?condition, "Skipping step, condition not met");
                let result = ModuleResult::skipped(&step.module, "condition not met");
                return self.record(result);
            }
        }

        let mut params = Params::new();
        if let Some(source) = &step.use_result_from {
            match self.context.get(source) {
                Some(Value::Object(data)) => params.extend(data.clone()),
                _ => warn!(module = %step.module, source = %source, "No stored result to chain from"),
            }
        }
        params.extend(step.params.clone());

        match self.execute_module(&step.module, params).await {
            Ok(result) => result,
            Err(err) => {
                warn!(module = %step.module, error = %err, "Workflow step references unknown module");
                self.record(ModuleResult::failure(&step.module, err.user_message()))
            }
        }
    }

    fn condition_met(&self, condition: &StepCondition) -> bool {
        match condition {
            StepCondition::ContextKeyExists { key } => self.context.contains(key),
            StepCondition::ContextValueEquals { key, value } => {
                self.context.get(key) == Some(value)
            }
            StepCondition::ModuleSucceeded { module } => self
                .context
                .get(&format!("{module}_result"))
                .and_then(|result| result.get("status"))
                .and_then(Value::as_str)
                == Some(ModuleStatus::Success.as_str()),
        }
    }

    pub fn summary(&self) -> OrchestratorSummary {
        let count = |status: ModuleStatus| self.history.iter().filter(|r| r.status == status).count();
        let total = self.history.len();
        let success = count(ModuleStatus::Success);
        OrchestratorSummary {
            total,
            success,
            failed: count(ModuleStatus::Failure),
            skipped: count(ModuleStatus::Skipped),
            partial: count(ModuleStatus::Partial),
            success_rate: if total == 0 {
                0.0
            } else {
                success as f64 / total as f64
            },
        }
    }
}
