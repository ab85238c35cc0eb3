//! The `results.json` document produced by every run.

use super::agent::TaskReport;
use super::anomaly::AnomalyReport;
use super::orchestrator::OrchestratorSummary;
use super::query::QueryOutcome;
use crate::domain::ModuleResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub modules: OrchestratorSummary,
    pub queries_total: usize,
    pub queries_succeeded: usize,
    pub tasks_total: usize,
    pub tasks_completed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_summary_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub modules: Vec<ModuleResult>,
    #[serde(default)]
    pub queries: Vec<QueryOutcome>,
    #[serde(default)]
    pub tasks: Vec<TaskReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyReport>,
    pub summary: RunSummary,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub output: String,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            modules: Vec::new(),
            queries: Vec::new(),
            tasks: Vec::new(),
            anomaly: None,
            summary: RunSummary::default(),
            context: Value::Object(Default::default()),
            output: String::new(),
        }
    }

    /// Recompute the query and task counters from the collected results.
    pub fn tally(&mut self) {
        self.summary.queries_total = self.queries.len();
        self.summary.queries_succeeded = self.queries.iter().filter(|q| q.success).count();
        self.summary.tasks_total = self.tasks.len();
        self.summary.tasks_completed = self.tasks.iter().filter(|t| t.is_success()).count();
    }

    /// No module failed, no query failed and every task completed.
    pub fn is_success(&self) -> bool {
        self.summary.modules.failed == 0
            && self.summary.queries_succeeded == self.summary.queries_total
            && self.summary.tasks_completed == self.summary.tasks_total
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json_pretty().map_err(io::Error::other)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, json)?;
        info!(path = %path.display(), "Results written");
        Ok(())
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModuleResult, Params};

    #[test]
    fn writes_pretty_json_with_lowercase_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/results.json");
        let mut report = RunReport::new();
        report.modules.push(ModuleResult::success("upstream_query", Params::new()));
        report.output = "done".into();
        report.write_to(&path).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["modules"][0]["status"], "success");
        assert_eq!(written["output"], "done");
        assert!(written["generated_at"].is_string());
        assert!(written["summary"].get("ai_summary").is_none());
        assert!(written.get("anomaly").is_none());
    }
}
