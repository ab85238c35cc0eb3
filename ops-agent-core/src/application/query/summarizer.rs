use super::executor::QueryOutcome;
use crate::infrastructure::llm::{ChatModel, ChatRequest, LlmError};
use crate::summarise;
use std::sync::Arc;
use tracing::info;

const CONTENT_LIMIT: usize = 2_000;
const SUMMARY_TEMPERATURE: f32 = 0.3;

const DEFAULT_SUMMARY_PROMPT: &str = "You are an operations assistant. Review the monitoring \
query results below and write a short markdown report: overall health, anomalies worth \
attention, and suggested next steps. Be concrete and reference the numbers you see.";

/// Asks the LLM for a narrative summary of query outcomes.
pub struct LlmSummarizer {
    llm: Arc<dyn ChatModel>,
    prompt: String,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self {
            llm,
            prompt: DEFAULT_SUMMARY_PROMPT.to_string(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub async fn summarize(&self, outcomes: &[QueryOutcome]) -> Result<String, LlmError> {
        let body = format_for_prompt(outcomes);
        info!(queries = outcomes.len(), "Requesting LLM summary of query results");
        let request = ChatRequest::prompt(Some(&self.prompt), body).with_temperature(SUMMARY_TEMPERATURE);
        let response = self.llm.chat(request).await?;
        info!(preview = %summarise(&response.content), "LLM summary received");
        Ok(response.content)
    }
}

/// One block per query: index, tool, description, status, arguments and truncated content.
pub fn format_for_prompt(outcomes: &[QueryOutcome]) -> String {
    outcomes
        .iter()
        .map(|outcome| {
            let status = if outcome.success { "success" } else { "failed" };
            let args = serde_json::to_string(&outcome.args).unwrap_or_default();
            let content = if outcome.success {
                outcome.formatted.clone().unwrap_or_default()
            } else {
                outcome.error.clone().unwrap_or_default()
            };
            let content = if content.chars().count() > CONTENT_LIMIT {
                let cut: String = content.chars().take(CONTENT_LIMIT).collect();
                format!("{cut}\n... (truncated)")
            } else {
                content
            };
            format!(
                "Query {index}\nTool: {tool}\nDescription: {desc}\nStatus: {status}\nArguments: {args}\nResult:\n{content}",
                index = outcome.query_index + 1,
                tool = outcome.tool_name.as_deref().unwrap_or("-"),
                desc = outcome.desc.as_deref().unwrap_or("-"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;
    use serde_json::Map;

    fn outcome(index: usize, formatted: &str) -> QueryOutcome {
        QueryOutcome {
            query_index: index,
            tool_name: Some("search-logs".into()),
            args: Map::new(),
            desc: Some("gateway errors".into()),
            formatter: None,
            mcp_server: "default".into(),
            success: true,
            result: None,
            error: None,
            formatted: Some(formatted.into()),
        }
    }

    #[test]
    fn long_results_are_truncated() {
        let text = format_for_prompt(&[outcome(0, &"x".repeat(CONTENT_LIMIT + 50))]);
        assert!(text.contains("... (truncated)"));
        assert!(text.contains("Query 1\nTool: search-logs"));
        assert!(!text.contains(&"x".repeat(CONTENT_LIMIT + 1)));
    }

    #[tokio::test]
    async fn summary_uses_low_temperature() {
        let model = Arc::new(ScriptedModel::new(["all quiet"]));
        let summarizer = LlmSummarizer::new(model.clone());
        let summary = summarizer.summarize(&[outcome(0, "3 errors")]).await.unwrap();
        assert_eq!(summary, "all quiet");
        let requests = model.requests();
        assert_eq!(requests[0].temperature, Some(SUMMARY_TEMPERATURE));
        assert!(requests[0].messages[1].content.contains("3 errors"));
    }
}
