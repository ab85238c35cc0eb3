use super::error_log_query::ERROR_LOG_QUERY;
use super::params::bool_param;
use super::upstream_query::UPSTREAM_QUERY;
use crate::application::orchestrator::{CheckModule, ModuleError};
use crate::domain::{ModuleResult, Params, SharedContext};
use crate::infrastructure::llm::{ChatModel, ChatRequest};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

pub const OPS_SUMMARY: &str = "ops_summary";
const SAMPLE_ERRORS: usize = 5;

const EXPAND_PROMPT: &str = "You are an SRE assistant. Expand the operational summary below \
into a concise markdown report with likely causes and next steps. Keep every number exactly \
as given.";

/// Combines upstream and error-log findings stored in the context into one markdown report.
pub struct OpsSummaryModule {
    llm: Option<Arc<dyn ChatModel>>,
}

impl OpsSummaryModule {
    pub fn new(llm: Option<Arc<dyn ChatModel>>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CheckModule for OpsSummaryModule {
    fn name(&self) -> &str {
        OPS_SUMMARY
    }

    fn description(&self) -> &str {
        "Summarize upstream and error log results (use_llm to expand)"
    }

    async fn execute(
        &self,
        params: Params,
        context: &mut SharedContext,
    ) -> Result<ModuleResult, ModuleError> {
        let upstream = stored_data(context, UPSTREAM_QUERY);
        let errors = stored_data(context, ERROR_LOG_QUERY);
        if upstream.is_none() && errors.is_none() {
            return Ok(ModuleResult::skipped(
                OPS_SUMMARY,
                "no upstream_query or error_log_query results in context",
            ));
        }

        let upstream_count = upstream
            .as_ref()
            .and_then(|data| data.pointer("/summary/total_upstreams"))
            .and_then(Value::as_u64);
        let error_count = errors
            .as_ref()
            .and_then(|data| data.pointer("/summary/total_errors"))
            .and_then(Value::as_u64);
        let service = upstream
            .as_ref()
            .and_then(|data| data.get("service_name"))
            .or_else(|| errors.as_ref().and_then(|data| data.get("service_name")))
            .and_then(Value::as_str)
            .unwrap_or("unknown service")
            .to_string();

        let mut summary = render_summary(&service, upstream_count, error_count, errors.as_ref());
        info!(service = %service, ?upstream_count, ?error_count, "Built ops summary");

        let mut data = Params::new();
        data.insert("service_name".into(), json!(service));
        data.insert("upstream_count".into(), json!(upstream_count));
        data.insert("error_count".into(), json!(error_count));

        let use_llm = bool_param(&params, "use_llm", false);
        let mut llm_error = None;
        if use_llm {
            match &self.llm {
                Some(llm) => {
                    let request = ChatRequest::prompt(Some(EXPAND_PROMPT), summary.clone())
                        .with_temperature(0.3);
                    match llm.chat(request).await {
                        Ok(response) => {
                            summary = format!("{summary}\n\n## AI Analysis\n{}", response.content.trim());
                        }
                        Err(err) => {
                            warn!(error = %err, "LLM expansion failed, keeping basic summary");
                            llm_error = Some(err.user_message());
                        }
                    }
                }
                None => llm_error = Some("LLM is not configured".to_string()),
            }
        }

        data.insert("summary".into(), json!(summary));
        Ok(match llm_error {
            Some(error) => ModuleResult::partial(OPS_SUMMARY, data, error),
            None => ModuleResult::success(OPS_SUMMARY, data),
        })
    }
}

/// Data of a module's stored result, when it ran successfully.
fn stored_data(context: &SharedContext, module: &str) -> Option<Value> {
    let result = context.get(&format!("{module}_result"))?;
    match result.get("status").and_then(Value::as_str) {
        Some("success") | Some("partial") => result.get("data").cloned(),
        _ => None,
    }
}

fn render_summary(
    service: &str,
    upstream_count: Option<u64>,
    error_count: Option<u64>,
    errors: Option<&Value>,
) -> String {
    let mut lines = vec![format!("# Ops summary: {service}"), String::new()];
    lines.push(match upstream_count {
        Some(count) => format!("- Upstreams: {count}"),
        None => "- Upstreams: not queried".to_string(),
    });
    lines.push(match error_count {
        Some(count) => format!("- Errors: {count}"),
        None => "- Errors: not queried".to_string(),
    });

    if let Some(types) = errors
        .and_then(|data| data.pointer("/summary/error_types"))
        .and_then(Value::as_object)
        .filter(|types| !types.is_empty())
    {
        let breakdown = types
            .iter()
            .map(|(level, count)| format!("{level}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("- Error levels: {breakdown}"));
    }

    let samples: Vec<String> = errors
        .and_then(|data| data.get("error_logs"))
        .and_then(Value::as_array)
        .map(|logs| {
            logs.iter()
                .filter_map(|log| log.get("message").and_then(Value::as_str))
                .take(SAMPLE_ERRORS)
                .map(|message| format!("  - {}", message.lines().next().unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();
    if !samples.is_empty() {
        lines.push(String::new());
        lines.push("Recent errors:".to_string());
        lines.extend(samples);
    }
    lines.join("\n")
}
