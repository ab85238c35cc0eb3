use super::error::ConfigError;
use super::llm::{RawLlmConfig, parse_headers};
use super::mcp::{McpServerConfig, RawMcpServer, merge_servers};
use super::settings::{AgentSettings, HttpConfig, NotifyConfig, QuerySettings, QuerySpec};
use super::workflow::WorkflowStep;
use super::AppConfig;
use crate::constants::{
    CONFIG_PATH, DEFAULT_SERVER_ALIAS, ENV_HOST, ENV_LLM_HEADERS_JSON, ENV_LLM_MODEL,
    ENV_LLM_TOKEN, ENV_LLM_URL, ENV_MCP_SERVER_URL, ENV_MCP_SERVERS_JSON, ENV_MCP_TOKEN,
    ENV_NOTIFY_KEY, ENV_NOTIFY_URL, ENV_PATH, ENV_PORT,
};
use dotenvy::from_filename;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Once;
use tracing::{debug, info};

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from YAML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub mcp_servers: Vec<RawMcpServer>,
    #[serde(default)]
    pub llm: RawLlmConfig,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub queries: Vec<QuerySpec>,
    #[serde(default)]
    pub workflow: Vec<WorkflowStep>,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub server: HttpConfig,
    #[serde(default)]
    pub agent: AgentSettings,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
    });
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    let env = |key: &str| std::env::var(key).ok();
    match path {
        Some(path) => read_config(path, &env),
        None => {
            let default_path = Path::new(CONFIG_PATH);
            if default_path.exists() {
                read_config(default_path, &env)
            } else {
                info!(
                    path = CONFIG_PATH,
                    "No configuration file found, using environment only"
                );
                build(RawConfig::default(), &env)
            }
        }
    }
}

fn read_config<F>(path: &Path, env: &F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    debug!(path = %path.display(), "Reading agent configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, path, env)
}

pub(super) fn parse_config<F>(content: &str, path: &Path, env: &F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let parsed: RawConfig = if content.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yaml_bw::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };
    build(parsed, env)
}

fn build<F>(parsed: RawConfig, env: &F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env_value = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    let mut raw_servers = parsed.mcp_servers;
    if let Some(json) = env_value(ENV_MCP_SERVERS_JSON) {
        let env_servers: Vec<RawMcpServer> =
            serde_json::from_str(&json).map_err(|err| ConfigError::InvalidEnv {
                var: ENV_MCP_SERVERS_JSON.to_string(),
                reason: err.to_string(),
            })?;
        info!(
            count = env_servers.len(),
            "Loaded MCP servers from environment"
        );
        raw_servers = merge_servers(raw_servers, env_servers);
    }
    if raw_servers.is_empty() {
        if let Some(url) = env_value(ENV_MCP_SERVER_URL) {
            raw_servers.push(RawMcpServer {
                name: Some(DEFAULT_SERVER_ALIAS.to_string()),
                server_url: Some(url),
                token: env_value(ENV_MCP_TOKEN),
                ..RawMcpServer::default()
            });
        }
    }
    let mcp_servers = raw_servers
        .into_iter()
        .map(McpServerConfig::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let mut raw_llm = parsed.llm;
    if let Some(url) = env_value(ENV_LLM_URL) {
        raw_llm.url = Some(url);
    }
    if let Some(token) = env_value(ENV_LLM_TOKEN) {
        raw_llm.token = Some(token);
    }
    if let Some(model) = env_value(ENV_LLM_MODEL) {
        raw_llm.model = Some(model);
    }
    let mut llm = raw_llm.build()?;
    if let Some(json) = env_value(ENV_LLM_HEADERS_JSON) {
        llm.headers
            .extend(parse_headers(&json, ENV_LLM_HEADERS_JSON)?);
    }

    let mut notify = parsed.notify;
    if let Some(url) = env_value(ENV_NOTIFY_URL) {
        notify.url = Some(url);
    }
    if let Some(key) = env_value(ENV_NOTIFY_KEY) {
        notify.key = Some(key);
    }

    let mut server = parsed.server;
    if let Some(host) = env_value(ENV_HOST) {
        server.host = host;
    }
    if let Some(port) = env_value(ENV_PORT) {
        server.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
            var: ENV_PORT.to_string(),
            reason: format!("'{port}' is not a valid port"),
        })?;
    }

    debug!(
        servers = mcp_servers.len(),
        queries = parsed.queries.len(),
        workflow_steps = parsed.workflow.len(),
        "Configuration resolved"
    );

    Ok(AppConfig {
        mcp_servers,
        llm,
        query: parsed.query,
        queries: parsed.queries,
        workflow: parsed.workflow,
        notify,
        server,
        agent: parsed.agent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SAMPLE: &str = r#"
mcp_servers:
  - name: ops
    server_url: http://ops.internal/mcp
    token: file-token
    timeout: 45s
  - name: logs
    server_url: http://logs.internal/mcp
    default: true
llm:
  url: http://llm.internal/chat
  model: gpt-4o-mini
query:
  default_time_range: 30m
  time_param_names: from,to
queries:
  - tool_name: query-prometheus
    desc: error rate
    args:
      query: rate(http_requests_total[5m])
workflow:
  - module: upstream_query
    params:
      service_name: checkout
  - module: error_log_query
    params:
      use_context: true
    condition:
      type: module_succeeded
      module: upstream_query
"#;

    #[test]
    fn parses_file_values() {
        let config = parse_config(SAMPLE, Path::new("test.yaml"), &env_from(&[]))
            .expect("config parses");

        assert_eq!(config.mcp_servers.len(), 2);
        assert_eq!(config.mcp_servers[0].timeout, Duration::from_secs(45));
        assert_eq!(config.default_mcp_server().map(|s| s.name.as_str()), Some("logs"));
        assert_eq!(config.mcp_server("unknown").map(|s| s.name.as_str()), Some("logs"));
        assert_eq!(config.mcp_server("ops").map(|s| s.name.as_str()), Some("ops"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.query.default_time_range, "30m");
        assert_eq!(config.queries.len(), 1);
        assert_eq!(config.workflow.len(), 2);
        assert!(config.workflow[1].condition.is_some());
    }

    #[test]
    fn environment_wins_over_file() {
        let env = env_from(&[
            ("LLM_URL", "http://override/chat"),
            ("LLM_TOKEN", "env-token"),
            ("LLM_HEADERS_JSON", r#"{"X-Tenant":"ops"}"#),
            (
                "MCP_SERVERS_JSON",
                r#"[{"name":"ops","token":"env-token"},{"name":"traces","server_url":"http://traces/mcp"}]"#,
            ),
            ("PORT", "9090"),
        ]);
        let config = parse_config(SAMPLE, Path::new("test.yaml"), &env).expect("config parses");

        assert_eq!(config.llm.url.as_deref(), Some("http://override/chat"));
        assert_eq!(config.llm.token.as_deref(), Some("env-token"));
        assert_eq!(config.llm.headers["X-Tenant"], "ops");
        let ops = config.mcp_server("ops").expect("ops server");
        assert_eq!(ops.server_url, "http://ops.internal/mcp");
        assert_eq!(ops.token.as_deref(), Some("env-token"));
        assert!(config.mcp_servers.iter().any(|s| s.name == "traces"));
        assert_eq!(config.server.port, 9090);
    }

    #[test]
    fn invalid_environment_json_is_fatal() {
        let env = env_from(&[("MCP_SERVERS_JSON", "not json")]);
        let result = parse_config(SAMPLE, Path::new("test.yaml"), &env);
        assert!(matches!(result, Err(ConfigError::InvalidEnv { var, .. }) if var == "MCP_SERVERS_JSON"));
    }

    #[test]
    fn legacy_single_server_variables_are_used_when_list_is_empty() {
        let env = env_from(&[("MCP_SERVER_URL", "http://solo/mcp"), ("MCP_TOKEN", "t")]);
        let config = parse_config("", Path::new("empty.yaml"), &env).expect("config parses");
        let server = config.default_mcp_server().expect("default server");
        assert_eq!(server.name, "default");
        assert_eq!(server.token.as_deref(), Some("t"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let content = "mcp_servers:\n  - name: a\n    server_url: http://a\n    timeout: soon\n";
        let result = parse_config(content, Path::new("bad.yaml"), &env_from(&[]));
        assert!(matches!(result, Err(ConfigError::InvalidDuration { .. })));
    }
}
