use super::params::{server_param, str_param};
use crate::application::orchestrator::{CheckModule, ModuleError};
use crate::domain::{ModuleResult, Params, SharedContext};
use crate::infrastructure::mcp::ToolServerInterface;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

pub const UPSTREAM_QUERY: &str = "upstream_query";
const DEFAULT_TOOL: &str = "get-events-from-ops";
const PAGE_SIZE: &str = "50";

/// Collects upstream events for a service from the ops event stream.
pub struct UpstreamQueryModule {
    tools: Arc<dyn ToolServerInterface>,
}

impl UpstreamQueryModule {
    pub fn new(tools: Arc<dyn ToolServerInterface>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl CheckModule for UpstreamQueryModule {
    fn name(&self) -> &str {
        UPSTREAM_QUERY
    }

    fn description(&self) -> &str {
        "Query upstream events for a service (requires service_name)"
    }

    fn validate_params(&self, params: &Params, _context: &SharedContext) -> Result<(), String> {
        match str_param(params, "service_name") {
            Some(_) => Ok(()),
            None => Err("service_name parameter is required".to_string()),
        }
    }

    async fn execute(
        &self,
        params: Params,
        context: &mut SharedContext,
    ) -> Result<ModuleResult, ModuleError> {
        let service = str_param(&params, "service_name")
            .ok_or_else(|| ModuleError::InvalidParams("service_name parameter is required".into()))?
            .to_string();
        let server = server_param(&params);
        let tool = str_param(&params, "tool_name").unwrap_or(DEFAULT_TOOL).to_string();

        let mut arguments = Params::new();
        arguments.insert(
            "subject_pattern".into(),
            json!(format!("ops.clusters.*.namespaces.*.services.{service}.upstream.>")),
        );
        arguments.insert("page_size".into(), json!(PAGE_SIZE));
        if let Some(Value::Object(extra)) = params.get("additional_args") {
            arguments.extend(extra.clone());
        }

        info!(service = %service, server = %server, tool = %tool, "Querying upstream events");
        let result = self
            .tools
            .invoke_tool(&server, &tool, Value::Object(arguments))
            .await?;
        if result.is_error {
            let reason = result.error_message().unwrap_or_else(|| "unknown error".into());
            return Ok(ModuleResult::failure(
                UPSTREAM_QUERY,
                format!("MCP tool execution failed: {reason}"),
            ));
        }

        let upstreams = collect_upstreams(result.json_items());
        context.set("last_queried_service", service.clone());

        let mut data = Params::new();
        data.insert("service_name".into(), json!(service));
        data.insert(
            "summary".into(),
            json!({
                "total_upstreams": upstreams.len(),
                "has_data": !upstreams.is_empty(),
            }),
        );
        data.insert("upstreams".into(), Value::Array(upstreams));
        Ok(ModuleResult::success(UPSTREAM_QUERY, data)
            .with_metadata("mcp_server", server)
            .with_metadata("tool_name", tool))
    }
}

/// Objects are kept, arrays flattened one level, plain text wrapped as `{"raw": ...}`.
fn collect_upstreams(items: Vec<Value>) -> Vec<Value> {
    let mut upstreams = Vec::new();
    for item in items {
        match item {
            Value::Array(entries) => upstreams.extend(entries.into_iter().map(wrap_entry)),
            other => upstreams.push(wrap_entry(other)),
        }
    }
    upstreams
}

fn wrap_entry(entry: Value) -> Value {
    match entry {
        Value::Object(_) => entry,
        Value::String(text) => json!({ "raw": text }),
        other => json!({ "raw": other }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubTools;
    use crate::infrastructure::mcp::ToolCallResult;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn builds_subject_pattern_and_counts_entries() {
        let tools = Arc::new(StubTools::new().respond(
            DEFAULT_TOOL,
            ToolCallResult {
                content: vec![
                    json!("{\"upstream\":\"db\"}"),
                    json!("plain text"),
                    json!([{"upstream": "cache"}, {"upstream": "queue"}]),
                ],
                ..Default::default()
            },
        ));
        let module = UpstreamQueryModule::new(tools.clone());
        let mut context = SharedContext::new();

        let result = module
            .execute(
                params(json!({"service_name": "checkout", "additional_args": {"page_size": "10"}})),
                &mut context,
            )
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(result.data["summary"]["total_upstreams"], json!(4));
        assert_eq!(result.data["upstreams"][1], json!({"raw": "plain text"}));
        assert_eq!(context.get_str("last_queried_service"), Some("checkout"));

        let call = &tools.calls()[0];
        assert_eq!(
            call.arguments["subject_pattern"],
            json!("ops.clusters.*.namespaces.*.services.checkout.upstream.>")
        );
        assert_eq!(call.arguments["page_size"], json!("10"));
    }

    #[tokio::test]
    async fn tool_errors_become_failures() {
        let tools = Arc::new(StubTools::new().respond(DEFAULT_TOOL, ToolCallResult::error("nats down")));
        let module = UpstreamQueryModule::new(tools);
        let result = module
            .execute(params(json!({"service_name": "checkout"})), &mut SharedContext::new())
            .await
            .unwrap();
        assert_eq!(result.error.as_deref(), Some("MCP tool execution failed: nats down"));
    }

    #[test]
    fn requires_service_name() {
        let module = UpstreamQueryModule::new(Arc::new(StubTools::new()));
        assert!(module.validate_params(&Params::new(), &SharedContext::new()).is_err());
    }
}
