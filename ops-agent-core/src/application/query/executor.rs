use super::formatters::Formatter;
use super::time_range::add_time_params;
use crate::config::{QuerySettings, QuerySpec};
use crate::constants::DEFAULT_SERVER_ALIAS;
use crate::infrastructure::mcp::{McpError, ToolDescriptor, ToolServerInterface};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one configured query, as written to `results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub query_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<String>,
    pub mcp_server: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
}

impl QueryOutcome {
    fn pending(index: usize, spec: &QuerySpec) -> Self {
        Self {
            query_index: index,
            tool_name: spec.tool_name.clone(),
            args: spec.args.clone(),
            desc: spec.desc.clone(),
            formatter: spec.formatter.clone(),
            mcp_server: spec
                .mcp_server
                .clone()
                .unwrap_or_else(|| DEFAULT_SERVER_ALIAS.to_string()),
            success: false,
            result: None,
            error: None,
            formatted: None,
        }
    }

    fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    /// Heading used in text output: the description, else the tool name.
    pub fn title(&self) -> String {
        self.desc
            .clone()
            .or_else(|| self.tool_name.clone())
            .unwrap_or_else(|| format!("query {}", self.query_index))
    }
}

/// Runs configured MCP queries one after another.
pub struct QueryExecutor {
    tools: Arc<dyn ToolServerInterface>,
    settings: QuerySettings,
}

impl QueryExecutor {
    pub fn new(tools: Arc<dyn ToolServerInterface>, settings: QuerySettings) -> Self {
        Self { tools, settings }
    }

    pub async fn list_available_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, McpError> {
        self.tools.list_tools(server).await
    }

    pub async fn execute_query(&self, index: usize, spec: &QuerySpec) -> QueryOutcome {
        let mut spec = spec.clone();
        let outcome = QueryOutcome::pending(index, &spec);
        let Some(tool) = spec.tool_name.clone().filter(|name| !name.trim().is_empty()) else {
            warn!(index, "Query is missing tool_name");
            return outcome.failed("Missing tool_name");
        };

        if add_time_params(
            &mut spec,
            &self.settings.default_time_range,
            self.settings.time_param_names.as_deref(),
        ) {
            info!(tool = %tool, range = %self.settings.default_time_range, "Added default time window");
        }
        let mut outcome = QueryOutcome {
            args: spec.args.clone(),
            ..outcome
        };

        match self
            .tools
            .invoke_tool(&outcome.mcp_server, &tool, Value::Object(spec.args))
            .await
        {
            Ok(result) if result.is_error => {
                let message = result
                    .error_message()
                    .unwrap_or_else(|| "tool reported an error".to_string());
                outcome.result = Some(result.to_value());
                outcome.failed(message)
            }
            Ok(result) => {
                let formatter = Formatter::select(spec.formatter.as_deref(), Some(&tool));
                outcome.formatted = Some(formatter.format(&result.json_items()));
                outcome.result = Some(result.to_value());
                outcome.success = true;
                outcome
            }
            Err(err) => outcome.failed(err.to_string()),
        }
    }

    /// Execute every query; failures are recorded per query and never stop the batch.
    pub async fn execute_queries(&self, specs: &[QuerySpec]) -> Vec<QueryOutcome> {
        let mut outcomes = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let outcome = self.execute_query(index, spec).await;
            info!(
                index,
                tool = outcome.tool_name.as_deref(),
                success = outcome.success,
                "Query finished"
            );
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Render outcomes as the markdown body of a run report.
pub fn render_outcomes(outcomes: &[QueryOutcome]) -> String {
    let mut sections = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let body = if outcome.success {
            outcome
                .formatted
                .clone()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| "(no data)".to_string())
        } else {
            format!(
                "Query failed: {}",
                outcome.error.as_deref().unwrap_or("unknown error")
            )
        };
        sections.push(format!("### {}\n{}", outcome.title(), body));
    }
    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mcp::ToolCallResult;
    use crate::test_support::StubTools;
    use serde_json::json;

    fn executor(tools: StubTools) -> (QueryExecutor, Arc<StubTools>) {
        let tools = Arc::new(tools);
        let executor = QueryExecutor::new(tools.clone(), QuerySettings::default());
        (executor, tools)
    }

    #[tokio::test]
    async fn missing_tool_name_fails_without_calling_server() {
        let (executor, tools) = executor(StubTools::new());
        let outcome = executor.execute_query(0, &QuerySpec::default()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("Missing tool_name"));
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn adds_default_window_only_when_absent() {
        let (executor, tools) = executor(StubTools::new().respond_json("query-metrics", json!([])));
        let plain = QuerySpec::new("query-metrics");
        let explicit = QuerySpec::new("query-metrics").with_arg("since", "2h");

        let first = executor.execute_query(0, &plain).await;
        let second = executor.execute_query(1, &explicit).await;

        assert!(first.args.contains_key("start_time"));
        assert!(first.args.contains_key("end_time"));
        assert!(!second.args.contains_key("start_time"));
        let calls = tools.calls();
        assert_eq!(calls[1].arguments, json!({"since": "2h"}));
        assert_eq!(calls[0].server, "default");
    }

    #[tokio::test]
    async fn tool_error_is_recorded_on_the_outcome() {
        let (executor, _) = executor(
            StubTools::new().respond("search-logs", ToolCallResult::error("index not found")),
        );
        let outcome = executor.execute_query(2, &QuerySpec::new("search-logs")).await;
        assert!(!outcome.success);
        assert_eq!(outcome.query_index, 2);
        assert_eq!(outcome.error.as_deref(), Some("index not found"));
    }

    #[tokio::test]
    async fn batch_continues_after_a_failure() {
        let (executor, _) = executor(
            StubTools::new()
                .fail("broken", "connection reset")
                .respond_json("query-metrics", json!({"status": "success"})),
        );
        let specs = vec![QuerySpec::new("broken"), QuerySpec::new("query-metrics")];
        let outcomes = executor.execute_queries(&specs).await;
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].success);
        assert!(outcomes[1].success);
        assert!(outcomes[1].formatted.is_some());

        let rendered = render_outcomes(&outcomes);
        assert!(rendered.contains("### broken\nQuery failed:"));
        assert!(rendered.contains("### query-metrics"));
    }
}
