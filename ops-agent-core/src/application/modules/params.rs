//! Lookups over loosely typed module parameters.

use crate::constants::DEFAULT_SERVER_ALIAS;
use crate::domain::Params;
use serde_json::Value;

/// Non-empty string parameter.
pub(crate) fn str_param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(crate) fn bool_param(params: &Params, key: &str, default: bool) -> bool {
    match params.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => matches!(text.as_str(), "true" | "1" | "yes"),
        _ => default,
    }
}

/// MCP server named by `mcp_server` or `server_name`, else the default alias.
pub(crate) fn server_param(params: &Params) -> String {
    str_param(params, "mcp_server")
        .or_else(|| str_param(params, "server_name"))
        .unwrap_or(DEFAULT_SERVER_ALIAS)
        .to_string()
}
