use super::params::{bool_param, server_param, str_param};
use crate::application::orchestrator::{CheckModule, ModuleError};
use crate::config::parse_duration;
use crate::domain::{ModuleResult, Params, SharedContext};
use crate::infrastructure::mcp::ToolServerInterface;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const ERROR_LOG_QUERY: &str = "error_log_query";
const DEFAULT_TOOL: &str = "search-logs-from-elasticsearch";
const DEFAULT_INDEX: &str = "logs-*";
const DEFAULT_RANGE: &str = "1h";
const QUERY_KEYS: [&str; 4] = ["service_name", "index", "query_body", "use_context"];

/// Searches Elasticsearch for error and exception logs of a service.
pub struct ErrorLogQueryModule {
    tools: Arc<dyn ToolServerInterface>,
}

impl ErrorLogQueryModule {
    pub fn new(tools: Arc<dyn ToolServerInterface>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl CheckModule for ErrorLogQueryModule {
    fn name(&self) -> &str {
        ERROR_LOG_QUERY
    }

    fn description(&self) -> &str {
        "Search error logs (service_name, index, query_body or use_context)"
    }

    fn validate_params(&self, params: &Params, _context: &SharedContext) -> Result<(), String> {
        if QUERY_KEYS.iter().any(|key| params.contains_key(*key)) {
            Ok(())
        } else {
            Err("at least one of service_name, index, query_body or use_context must be provided".into())
        }
    }

    async fn execute(
        &self,
        params: Params,
        context: &mut SharedContext,
    ) -> Result<ModuleResult, ModuleError> {
        let service = match str_param(&params, "service_name") {
            Some(service) => Some(service.to_string()),
            None if bool_param(&params, "use_context", true) => {
                let service = context.get_str("last_queried_service").map(str::to_string);
                if let Some(service) = &service {
                    info!(service = %service, "Using service name from context");
                }
                service
            }
            None => None,
        };
        let index = str_param(&params, "index").unwrap_or(DEFAULT_INDEX).to_string();
        let server = server_param(&params);
        let tool = str_param(&params, "tool_name").unwrap_or(DEFAULT_TOOL).to_string();
        let range = str_param(&params, "time_range").unwrap_or(DEFAULT_RANGE).to_string();

        let body = match params.get("query_body") {
            Some(Value::String(raw)) if !raw.trim().is_empty() => raw.clone(),
            Some(body @ Value::Object(_)) => body.to_string(),
            _ => {
                parse_duration(&range).map_err(|err| ModuleError::InvalidParams(err.to_string()))?;
                default_error_query(service.as_deref(), &range).to_string()
            }
        };
        debug!(body = %body, "Error log query body");

        info!(service = service.as_deref().unwrap_or("all"), index = %index, "Querying error logs");
        let result = self
            .tools
            .invoke_tool(&server, &tool, json!({ "index": index, "body": body }))
            .await?;
        if result.is_error {
            let reason = result.error_message().unwrap_or_else(|| "unknown error".into());
            return Ok(ModuleResult::failure(
                ERROR_LOG_QUERY,
                format!("MCP tool execution failed: {reason}"),
            ));
        }

        let logs = collect_error_logs(result.json_items());
        let summary = json!({
            "total_errors": logs.len(),
            "error_types": count_levels(&logs),
        });
        context.set("error_log_summary", summary.clone());

        let mut data = Params::new();
        data.insert("service_name".into(), json!(service));
        data.insert("index".into(), json!(index));
        data.insert("error_logs".into(), Value::Array(logs));
        data.insert("summary".into(), summary);
        Ok(ModuleResult::success(ERROR_LOG_QUERY, data)
            .with_metadata("mcp_server", server)
            .with_metadata("tool_name", tool)
            .with_metadata("time_range", range))
    }
}

/// Newest 100 entries at error/fatal level or mentioning an exception.
pub fn default_error_query(service: Option<&str>, range: &str) -> Value {
    let mut must = vec![
        json!({ "range": { "@timestamp": { "gte": format!("now-{range}") } } }),
        json!({
            "bool": {
                "should": [
                    { "match": { "level": "ERROR" } },
                    { "match": { "level": "error" } },
                    { "match": { "level": "FATAL" } },
                    { "match": { "level": "fatal" } },
                    { "match": { "message": "exception" } },
                    { "match": { "message": "Exception" } },
                    { "match": { "message": "error" } },
                    { "match": { "message": "Error" } }
                ],
                "minimum_should_match": 1
            }
        }),
    ];
    if let Some(service) = service {
        must.push(json!({ "match": { "service": service } }));
    }
    json!({
        "size": 100,
        "query": { "bool": { "must": must } },
        "sort": [ { "@timestamp": { "order": "desc" } } ]
    })
}

/// Elasticsearch responses contribute each hit's `_source`; bare objects are kept as is.
fn collect_error_logs(items: Vec<Value>) -> Vec<Value> {
    let mut logs = Vec::new();
    for item in items {
        match item {
            Value::Object(ref object) if object.contains_key("hits") => {
                let hits = item
                    .pointer("/hits/hits")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                logs.extend(
                    hits.into_iter()
                        .map(|hit| hit.get("_source").cloned().unwrap_or(hit)),
                );
            }
            Value::Object(_) => logs.push(item),
            Value::Array(entries) => logs.extend(entries.into_iter().filter(Value::is_object)),
            _ => {}
        }
    }
    logs
}

fn count_levels(logs: &[Value]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for log in logs {
        let level = log
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_uppercase();
        *counts.entry(level).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubTools;

    fn es_response(count: usize) -> Value {
        let hits: Vec<Value> = (0..count)
            .map(|i| {
                json!({"_id": i, "_source": {
                    "level": if i % 3 == 0 { "fatal" } else { "ERROR" },
                    "message": format!("NullPointerException #{i}")
                }})
            })
            .collect();
        json!({"hits": {"total": {"value": count}, "hits": hits}})
    }

    #[tokio::test]
    async fn uses_context_service_and_parses_hits() {
        let tools = Arc::new(StubTools::new().respond_json(DEFAULT_TOOL, es_response(12)));
        let module = ErrorLogQueryModule::new(tools.clone());
        let mut context = SharedContext::new();
        context.set("last_queried_service", "checkout");

        let params = json!({"use_context": true}).as_object().cloned().unwrap();
        let result = module.execute(params, &mut context).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.data["service_name"], json!("checkout"));
        assert_eq!(result.data["summary"]["total_errors"], json!(12));
        assert_eq!(result.data["summary"]["error_types"]["FATAL"], json!(4));
        assert_eq!(context.get("error_log_summary").unwrap()["total_errors"], json!(12));

        let call = &tools.calls()[0];
        assert_eq!(call.arguments["index"], json!(DEFAULT_INDEX));
        let body: Value = serde_json::from_str(call.arguments["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["size"], json!(100));
        assert_eq!(body["query"]["bool"]["must"][2], json!({"match": {"service": "checkout"}}));
    }

    #[test]
    fn default_query_uses_time_range() {
        let query = default_error_query(None, "30m");
        assert_eq!(
            query["query"]["bool"]["must"][0]["range"]["@timestamp"]["gte"],
            json!("now-30m")
        );
        assert_eq!(query["query"]["bool"]["must"].as_array().unwrap().len(), 2);
        assert_eq!(query["sort"][0]["@timestamp"]["order"], json!("desc"));
    }

    #[tokio::test]
    async fn rejects_invalid_time_range() {
        let module = ErrorLogQueryModule::new(Arc::new(StubTools::new()));
        let params = json!({"service_name": "checkout", "time_range": "soon"})
            .as_object()
            .cloned()
            .unwrap();
        let err = module.execute(params, &mut SharedContext::new()).await.unwrap_err();
        assert!(matches!(err, ModuleError::InvalidParams(_)));
    }

    #[test]
    fn requires_some_query_hint() {
        let module = ErrorLogQueryModule::new(Arc::new(StubTools::new()));
        assert!(module.validate_params(&Params::new(), &SharedContext::new()).is_err());
    }
}
