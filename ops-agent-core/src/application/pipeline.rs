//! One complete run: workflow, configured queries, trigger-data analysis,
//! optional AI summary and notification.

use super::agent::{AgentOptions, AgentRunner, TaskReport};
use super::anomaly::{AlarmEvent, AnomalyAnalyzer, render_report};
use super::modules::{NOTIFY, NOTIFY_KEY_CONTEXT, register_builtin_modules};
use super::orchestrator::{Orchestrator, OrchestratorError};
use super::query::{LlmSummarizer, QueryExecutor, render_outcomes};
use super::report::RunReport;
use super::trigger::{
    TRIGGER_DATA_CONTEXT, TRIGGER_KEY_CONTEXT, analyse_payload, analysis_message,
};
use crate::config::{AppConfig, TaskSpec};
use crate::domain::{ModuleStatus, Params};
use crate::infrastructure::llm::{ChatModel, LlmClient};
use crate::infrastructure::mcp::{ServerManager, ToolServerInterface};
use crate::infrastructure::notify::WebhookNotifier;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-run switches, shared by the CLI `run` command and `/trigger`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub summary: bool,
    pub notify: bool,
    pub notify_key: Option<String>,
    /// Payload stored in the context as `trigger_data` and analysed by the LLM.
    pub trigger_data: Option<Value>,
}

/// Long-lived dependencies; every run gets its own [`Orchestrator`].
#[derive(Clone)]
pub struct CheckPipeline {
    config: Arc<AppConfig>,
    tools: Arc<dyn ToolServerInterface>,
    llm: Arc<dyn ChatModel>,
    notifier: WebhookNotifier,
}

impl CheckPipeline {
    pub fn new(
        config: AppConfig,
        tools: Arc<dyn ToolServerInterface>,
        llm: Arc<dyn ChatModel>,
    ) -> Self {
        let notifier = WebhookNotifier::new(config.notify.clone());
        Self {
            config: Arc::new(config),
            tools,
            llm,
            notifier,
        }
    }

    /// Wire the real MCP, LLM and webhook clients from configuration.
    pub fn from_config(config: AppConfig) -> Self {
        let tools: Arc<dyn ToolServerInterface> = Arc::new(ServerManager::from_config(&config));
        let llm: Arc<dyn ChatModel> = Arc::new(LlmClient::new(config.llm.clone()));
        Self::new(config, tools, llm)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn tools(&self) -> Arc<dyn ToolServerInterface> {
        Arc::clone(&self.tools)
    }

    /// A fresh orchestrator with every built-in module registered.
    pub fn orchestrator(&self) -> Orchestrator {
        let mut orchestrator = Orchestrator::new();
        register_builtin_modules(
            &mut orchestrator,
            self.tools(),
            Arc::clone(&self.llm),
            self.notifier.clone(),
        );
        orchestrator
    }

    pub async fn run(&self, options: RunOptions) -> RunReport {
        let mut orchestrator = self.orchestrator();
        if let Some(data) = options.trigger_data.clone() {
            orchestrator.set_context(TRIGGER_DATA_CONTEXT, data);
        }
        if let Some(key) = &options.notify_key {
            orchestrator.set_context(NOTIFY_KEY_CONTEXT, key.clone());
            orchestrator.set_context(TRIGGER_KEY_CONTEXT, key.clone());
        }

        let mut report = RunReport::new();
        if !self.config.workflow.is_empty() {
            info!(steps = self.config.workflow.len(), "Running workflow");
            orchestrator.execute_workflow(&self.config.workflow).await;
        }

        if !self.config.queries.is_empty() {
            let executor = QueryExecutor::new(self.tools(), self.config.query.clone());
            report.queries = executor.execute_queries(&self.config.queries).await;
        }

        let analysis = match &options.trigger_data {
            Some(data) => analyse_payload(&mut orchestrator, data, options.notify_key.as_deref()).await,
            None => None,
        };

        let mut sections = vec![format!(
            "# Ops agent report ({})",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )];
        if !orchestrator.history().is_empty() {
            sections.push(render_modules(&orchestrator));
        }
        if !report.queries.is_empty() {
            sections.push(format!("## Query results\n\n{}", render_outcomes(&report.queries)));
        }
        if let Some(answer) = &analysis {
            sections.push(format!("## Trigger analysis\n\n{}", answer.trim()));
        }

        if options.summary && !report.queries.is_empty() {
            match LlmSummarizer::new(Arc::clone(&self.llm))
                .summarize(&report.queries)
                .await
            {
                Ok(summary) => {
                    sections.push(format!("## AI Summary\n\n{}", summary.trim()));
                    report.summary.ai_summary = Some(summary);
                }
                Err(err) => {
                    warn!(error = %err, "AI summary failed");
                    report.summary.ai_summary_error = Some(err.user_message());
                }
            }
        }
        report.output = sections.join("\n\n");

        if options.notify {
            let content = match &analysis {
                Some(answer) => analysis_message(answer),
                None => report.output.clone(),
            };
            let mut params = Params::new();
            params.insert("content".into(), json!(content));
            if let Err(err) = orchestrator.execute_module(NOTIFY, params).await {
                warn!(error = %err, "Notification module unavailable");
            }
        }

        self.finish(report, &orchestrator)
    }

    /// Run a single module with explicit parameters.
    pub async fn run_module(&self, name: &str, params: Params) -> Result<RunReport, OrchestratorError> {
        let mut orchestrator = self.orchestrator();
        let result = orchestrator.execute_module(name, params).await?;
        let mut report = RunReport::new();
        report.output = match result.status {
            ModuleStatus::Failure => format!(
                "{name}: failure\n{}",
                result.error.as_deref().unwrap_or("unknown error")
            ),
            status => format!(
                "{name}: {}\n{}",
                status.as_str(),
                serde_json::to_string_pretty(&result.data).unwrap_or_default()
            ),
        };
        Ok(self.finish(report, &orchestrator))
    }

    pub async fn run_agent(&self, tasks: &[TaskSpec], options: AgentOptions) -> RunReport {
        let runner = AgentRunner::new(Arc::clone(&self.llm), self.tools(), options);
        let mut report = RunReport::new();
        report.tasks = runner.run_tasks(tasks).await;
        report.output = render_tasks(&report.tasks);
        report.tally();
        report
    }

    /// Classify an alarm and report its likely anomaly points. No tools or LLM are involved.
    pub fn run_alarm(&self, alarm: &AlarmEvent, analyzer: AnomalyAnalyzer) -> RunReport {
        let analysis = analyzer.analyse(alarm);
        let mut report = RunReport::new();
        report.output = render_report(&analysis);
        report.anomaly = Some(analysis);
        report.tally();
        report
    }

    fn finish(&self, mut report: RunReport, orchestrator: &Orchestrator) -> RunReport {
        report.modules = orchestrator.history().to_vec();
        report.summary.modules = orchestrator.summary();
        report.context = orchestrator.context().snapshot();
        report.tally();
        report
    }
}

fn render_modules(orchestrator: &Orchestrator) -> String {
    let mut lines = vec!["## Modules".to_string(), String::new()];
    for result in orchestrator.history() {
        let mut line = format!("- {}: {}", result.module_name, result.status.as_str());
        if let Some(error) = &result.error {
            line.push_str(&format!(" ({error})"));
        }
        lines.push(line);
    }
    if let Some(summary) = orchestrator
        .context()
        .get("ops_summary")
        .and_then(|data| data.get("summary"))
        .and_then(Value::as_str)
    {
        lines.push(String::new());
        lines.push(summary.to_string());
    }
    lines.join("\n")
}

fn render_tasks(tasks: &[TaskReport]) -> String {
    tasks
        .iter()
        .map(|task| {
            format!(
                "<!-- {} ({}, {} iterations) -->\n{}",
                task.task_name,
                task.status.as_str(),
                task.iterations,
                task.summary
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QuerySpec, WorkflowStep};
    use crate::test_support::{ScriptedModel, StubTools};

    fn upstreams(count: usize) -> Value {
        Value::Array((0..count).map(|i| json!({"upstream": format!("svc-{i}")})).collect())
    }

    fn error_hits(count: usize) -> Value {
        let hits: Vec<Value> = (0..count)
            .map(|i| json!({"_source": {"level": "ERROR", "message": format!("boom {i}")}}))
            .collect();
        json!({"hits": {"hits": hits}})
    }

    fn pipeline(config: AppConfig, model: ScriptedModel) -> CheckPipeline {
        let tools = StubTools::new()
            .respond_json("get-events-from-ops", upstreams(5))
            .respond_json("search-logs-from-elasticsearch", error_hits(12))
            .respond_json("query-metrics", json!({"status": "success", "data": {"result": []}}));
        CheckPipeline::new(config, Arc::new(tools), Arc::new(model))
    }

    #[tokio::test]
    async fn workflow_summary_reports_upstream_and_error_counts() {
        let config = AppConfig {
            workflow: vec![
                WorkflowStep::new("upstream_query").with_param("service_name", "checkout"),
                WorkflowStep::new("error_log_query").with_param("use_context", true),
                WorkflowStep::new("ops_summary"),
            ],
            ..AppConfig::default()
        };
        let report = pipeline(config, ScriptedModel::new(Vec::<String>::new()))
            .run(RunOptions::default())
            .await;

        assert_eq!(report.modules.len(), 3);
        assert!(report.is_success());
        let summary = report.context["ops_summary"]["summary"].as_str().unwrap();
        assert!(summary.contains("Upstreams: 5"));
        assert!(summary.contains("Errors: 12"));
        assert!(report.output.contains("- ops_summary: success"));
    }

    #[tokio::test]
    async fn queries_feed_the_ai_summary() {
        let config = AppConfig {
            queries: vec![QuerySpec::new("query-metrics")],
            ..AppConfig::default()
        };
        let options = RunOptions {
            summary: true,
            ..RunOptions::default()
        };
        let report = pipeline(config, ScriptedModel::new(["metrics look fine"]))
            .run(options)
            .await;

        assert_eq!(report.summary.queries_total, 1);
        assert_eq!(report.summary.ai_summary.as_deref(), Some("metrics look fine"));
        assert!(report.output.contains("## AI Summary\n\nmetrics look fine"));
    }

    #[tokio::test]
    async fn service_key_collects_monitoring_before_analysis() {
        let tools = Arc::new(
            StubTools::new()
                .respond_json("get-events-from-ops", upstreams(4))
                .respond_json("search-logs-from-elasticsearch", error_hits(7)),
        );
        let model = Arc::new(ScriptedModel::new(["1. Problem: checkout is erroring"]));
        let pipeline = CheckPipeline::new(AppConfig::default(), tools.clone(), model.clone());
        let options = RunOptions {
            notify_key: Some("service_checkout".into()),
            trigger_data: Some(json!("p99 latency above 2s")),
            ..RunOptions::default()
        };
        let report = pipeline.run(options).await;

        let names: Vec<_> = report.modules.iter().map(|m| m.module_name.as_str()).collect();
        assert_eq!(names, ["upstream_query", "error_log_query", "llm_chat"]);
        let calls = tools.calls();
        assert_eq!(calls[0].arguments["page_size"], json!("50"));
        assert_eq!(calls[1].arguments["index"], json!("logs-*"));
        assert!(calls[1].arguments["body"].as_str().unwrap().contains("checkout"));

        let request = &model.requests()[0];
        assert!(request.messages[0].content.contains("professional ops expert"));
        let input = &request.messages[1].content;
        assert!(input.starts_with("p99 latency above 2s"));
        assert!(input.contains("Upstream status: success (4 upstreams)"));
        assert!(input.contains("Total errors: 7"));

        assert_eq!(report.context["trigger_analysis"], json!("1. Problem: checkout is erroring"));
        assert_eq!(report.context["trigger_key"], json!("service_checkout"));
        assert!(report.output.contains("## Trigger analysis\n\n1. Problem: checkout is erroring"));
    }

    #[tokio::test]
    async fn other_keys_send_payload_straight_to_the_llm() {
        let tools = Arc::new(StubTools::new());
        let model = Arc::new(ScriptedModel::new(["1. Problem: disk almost full"]));
        let pipeline = CheckPipeline::new(AppConfig::default(), tools.clone(), model.clone());
        let options = RunOptions {
            notify_key: Some("alerts".into()),
            trigger_data: Some(json!({"alert": "DiskPressure", "node": "n1"})),
            ..RunOptions::default()
        };
        let report = pipeline.run(options).await;

        assert!(tools.calls().is_empty());
        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.modules[0].module_name, "llm_chat");
        let input = &model.requests()[0].messages[1].content;
        assert!(input.contains("\"alert\": \"DiskPressure\""));
        assert!(!input.contains("Upstream status"));
        assert_eq!(report.context["trigger_data"]["node"], json!("n1"));
        assert!(report.output.contains("## Trigger analysis"));
    }

    #[tokio::test]
    async fn failed_analysis_adds_no_section() {
        let pipeline = pipeline(AppConfig::default(), ScriptedModel::failing());
        let options = RunOptions {
            trigger_data: Some(json!("cpu at 99%")),
            ..RunOptions::default()
        };
        let report = pipeline.run(options).await;

        assert_eq!(report.modules[0].status, ModuleStatus::Failure);
        assert!(report.context.get("trigger_analysis").is_none());
        assert!(!report.output.contains("## Trigger analysis"));
    }

    #[test]
    fn alarm_run_embeds_the_analysis() {
        let pipeline = pipeline(AppConfig::default(), ScriptedModel::new(Vec::<String>::new()));
        let alarm = AlarmEvent {
            event_id: "evt-7".into(),
            severity: "critical".into(),
            message: "service checkout returning 502".into(),
            ..AlarmEvent::default()
        };
        let report = pipeline.run_alarm(&alarm, AnomalyAnalyzer::default());

        let analysis = report.anomaly.as_ref().unwrap();
        assert_eq!(analysis.anomaly_type.type_name, "Service HTTP 5xx errors");
        assert_eq!(analysis.points[0].entity_id, "service/unidentified");
        assert!(report.output.starts_with("# Alarm analysis (evt-7)"));
        assert!(report.modules.is_empty());
        assert!(report.is_success());
    }

    #[test]
    fn analysis_message_is_markdown_with_timestamp() {
        let message = analysis_message("  all good \n");
        assert!(message.starts_with("## Analysis result\n\nall good\n\n---\n*Analysed at: "));
    }

    #[tokio::test]
    async fn failed_summary_is_recorded_not_fatal() {
        let config = AppConfig {
            queries: vec![QuerySpec::new("query-metrics")],
            ..AppConfig::default()
        };
        let options = RunOptions {
            summary: true,
            ..RunOptions::default()
        };
        let report = pipeline(config, ScriptedModel::failing()).run(options).await;
        assert!(report.summary.ai_summary.is_none());
        assert!(report.summary.ai_summary_error.is_some());
        assert!(!report.output.contains("## AI Summary"));
    }

    #[tokio::test]
    async fn single_module_runs_and_unknown_names_error() {
        let pipeline = pipeline(AppConfig::default(), ScriptedModel::new(Vec::<String>::new()));
        let params = json!({"service_name": "checkout"}).as_object().cloned().unwrap();
        let report = pipeline.run_module("upstream_query", params).await.unwrap();
        assert!(report.output.starts_with("upstream_query: success"));
        assert_eq!(report.summary.modules.total, 1);

        assert!(pipeline.run_module("nope", Params::new()).await.is_err());
    }
}
