//! Analysis of a payload pushed through `/trigger`.
//!
//! A `service_<name>` key pulls upstream events and error logs for that service
//! before asking the LLM; any other key sends the payload to the LLM as is.

use super::modules::{ERROR_LOG_QUERY, LLM_CHAT, UPSTREAM_QUERY};
use super::orchestrator::Orchestrator;
use crate::constants::DEFAULT_SERVER_ALIAS;
use crate::domain::{ModuleResult, ModuleStatus, Params};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{info, warn};

pub const TRIGGER_DATA_CONTEXT: &str = "trigger_data";
pub const TRIGGER_KEY_CONTEXT: &str = "trigger_key";
pub const TRIGGER_ANALYSIS_CONTEXT: &str = "trigger_analysis";

const SERVICE_KEY_PREFIX: &str = "service_";

pub const OPS_EXPERT_PROMPT: &str = "You are a professional ops expert. Answer concisely:\n\
1. Problem: one sentence\n\
2. Analysis: brief cause\n\
3. Recommendation: handling advice";

/// Service named by a `service_<name>` key.
pub fn service_from_key(key: Option<&str>) -> Option<&str> {
    key.and_then(|key| key.strip_prefix(SERVICE_KEY_PREFIX))
        .map(str::trim)
        .filter(|service| !service.is_empty())
}

/// Payload as prompt text: strings verbatim, anything else as pretty JSON.
pub fn payload_text(data: &Value) -> String {
    match data {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Run the analysis on `orchestrator` and return the LLM answer, if any.
///
/// Module outcomes land in the orchestrator history like any other step; a
/// failed LLM call yields `None`.
pub async fn analyse_payload(
    orchestrator: &mut Orchestrator,
    data: &Value,
    key: Option<&str>,
) -> Option<String> {
    let text = payload_text(data);
    if text.trim().is_empty() {
        warn!("Trigger data is empty, skipping analysis");
        return None;
    }
    info!(key = key.unwrap_or("(none)"), chars = text.chars().count(), "Analysing trigger data");

    let input = match service_from_key(key) {
        Some(service) => {
            let upstream = execute(orchestrator, UPSTREAM_QUERY, upstream_params(service)).await;
            let errors = execute(orchestrator, ERROR_LOG_QUERY, error_log_params(service)).await;
            service_prompt(&text, upstream.as_ref(), errors.as_ref())
        }
        None => text,
    };

    let mut params = Params::new();
    params.insert("input".into(), json!(input));
    params.insert("system_prompt".into(), json!(OPS_EXPERT_PROMPT));
    let answer = execute(orchestrator, LLM_CHAT, params)
        .await
        .filter(|result| result.status == ModuleStatus::Success)
        .and_then(|result| result.data.get("response").and_then(Value::as_str).map(str::to_string))?;

    orchestrator.set_context(TRIGGER_ANALYSIS_CONTEXT, answer.clone());
    Some(answer)
}

/// Markdown body sent to the webhook for a finished analysis.
pub fn analysis_message(answer: &str) -> String {
    format!(
        "## Analysis result\n\n{}\n\n---\n*Analysed at: {}*",
        answer.trim(),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

async fn execute(orchestrator: &mut Orchestrator, module: &str, params: Params) -> Option<ModuleResult> {
    match orchestrator.execute_module(module, params).await {
        Ok(result) => Some(result),
        Err(err) => {
            warn!(module, error = %err, "Analysis step unavailable");
            None
        }
    }
}

fn upstream_params(service: &str) -> Params {
    let mut params = Params::new();
    params.insert("service_name".into(), json!(service));
    params.insert("mcp_server".into(), json!(DEFAULT_SERVER_ALIAS));
    params.insert("tool_name".into(), json!("get-events-from-ops"));
    params.insert("additional_args".into(), json!({"page_size": "50"}));
    params
}

fn error_log_params(service: &str) -> Params {
    let mut params = Params::new();
    params.insert("service_name".into(), json!(service));
    params.insert("index".into(), json!("logs-*"));
    params.insert("time_range".into(), json!("1h"));
    params.insert("mcp_server".into(), json!(DEFAULT_SERVER_ALIAS));
    params.insert("tool_name".into(), json!("search-logs-from-elasticsearch"));
    params
}

fn service_prompt(text: &str, upstream: Option<&ModuleResult>, errors: Option<&ModuleResult>) -> String {
    let status = |result: Option<&ModuleResult>| result.map_or("unavailable", |r| r.status.as_str());
    let upstreams = upstream
        .and_then(|r| r.data.get("summary"))
        .and_then(|summary| summary.get("total_upstreams"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let total_errors = errors
        .and_then(|r| r.data.get("summary"))
        .and_then(|summary| summary.get("total_errors"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    format!(
        "{text}\n\nPlease analyse with the following monitoring data:\n\
- Upstream status: {} ({upstreams} upstreams)\n\
- Error log status: {}\n\
- Total errors: {total_errors}",
        status(upstream),
        status(errors),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_keys_name_the_service() {
        assert_eq!(service_from_key(Some("service_checkout")), Some("checkout"));
        assert_eq!(service_from_key(Some("service_")), None);
        assert_eq!(service_from_key(Some("alerts")), None);
        assert_eq!(service_from_key(None), None);
    }

    #[test]
    fn payload_text_keeps_strings_verbatim() {
        assert_eq!(payload_text(&json!("cpu at 95%")), "cpu at 95%");
        let structured = payload_text(&json!({"alert": "disk"}));
        assert!(structured.contains("\"alert\": \"disk\""));
    }

    #[test]
    fn service_prompt_lists_monitoring_results() {
        let upstream = ModuleResult::success(UPSTREAM_QUERY, {
            let mut data = Params::new();
            data.insert("summary".into(), json!({"total_upstreams": 3}));
            data
        });
        let prompt = service_prompt("latency spike", Some(&upstream), None);
        assert!(prompt.starts_with("latency spike\n\n"));
        assert!(prompt.contains("- Upstream status: success (3 upstreams)"));
        assert!(prompt.contains("- Error log status: unavailable"));
        assert!(prompt.contains("- Total errors: 0"));
    }
}
