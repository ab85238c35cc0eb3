// Config loading tests - file, environment and precedence
//
// Tests that touch process environment run serially and restore what they change.

use ops_agent_core::config::{AppConfig, ConfigError, StepCondition, TaskFile};
use serial_test::serial;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::tempdir;

const OVERRIDE_VARS: [&str; 6] = [
    "MCP_SERVERS_JSON",
    "MCP_SERVER_URL",
    "MCP_TOKEN",
    "LLM_URL",
    "LLM_MODEL",
    "PORT",
];

/// Sets variables for the duration of a test; everything in `OVERRIDE_VARS` starts cleared.
struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn new(vars: &[(&str, &str)]) -> Self {
        let saved = OVERRIDE_VARS
            .iter()
            .map(|key| (key.to_string(), std::env::var(key).ok()))
            .collect();
        // SAFETY: tests using the guard are #[serial], so no other thread reads the environment.
        unsafe {
            for key in OVERRIDE_VARS {
                std::env::remove_var(key);
            }
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: see EnvGuard::new.
        unsafe {
            for (key, value) in &self.saved {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    fs::write(&path, content).expect("Failed to write config");
    path
}

const FULL_CONFIG: &str = r#"
mcp_servers:
  - name: ops
    server_url: http://ops.internal/mcp
    timeout: 45s
  - name: logs
    server_url: http://logs.internal/mcp
    default: true
llm:
  url: http://llm.internal/chat
  model: gpt-4o-mini
server:
  host: 127.0.0.1
  port: 9100
agent:
  max_iterations: 3
  tasks_file: config/tasks.yaml
workflow:
  - module: upstream_query
    params:
      service_name: checkout
  - module: error_log_query
    condition:
      type: module_succeeded
      module: upstream_query
  - module: ops_summary
"#;

#[test]
#[serial]
fn returns_error_when_explicit_file_missing() {
    let _env = EnvGuard::new(&[]);
    let result = AppConfig::load(Some(Path::new("/nonexistent/path/config.yaml")));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
#[serial]
fn loads_every_section_from_file() {
    let _env = EnvGuard::new(&[]);
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), FULL_CONFIG);

    let config = AppConfig::load(Some(&path)).expect("config loads");

    assert_eq!(config.mcp_servers.len(), 2);
    assert_eq!(config.mcp_servers[0].timeout, Duration::from_secs(45));
    assert_eq!(config.default_mcp_server().map(|s| s.name.as_str()), Some("logs"));
    assert_eq!(config.llm.url.as_deref(), Some("http://llm.internal/chat"));
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.agent.max_iterations, 3);
    assert_eq!(config.workflow.len(), 3);
    assert_eq!(
        config.workflow[1].condition,
        Some(StepCondition::ModuleSucceeded {
            module: "upstream_query".into()
        })
    );
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let _env = EnvGuard::new(&[
        (
            "MCP_SERVERS_JSON",
            r#"[{"name":"ops","token":"env-token"},{"name":"metrics","server_url":"http://metrics/mcp"}]"#,
        ),
        ("LLM_MODEL", "gpt-4.1"),
        ("PORT", "9200"),
    ]);
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), FULL_CONFIG);

    let config = AppConfig::load(Some(&path)).expect("config loads");

    let ops = config.mcp_server("ops").expect("ops server");
    assert_eq!(ops.server_url, "http://ops.internal/mcp");
    assert_eq!(ops.token.as_deref(), Some("env-token"));
    assert_eq!(config.mcp_servers.len(), 3);
    assert_eq!(config.llm.model, "gpt-4.1");
    assert_eq!(config.server.port, 9200);
}

#[test]
#[serial]
fn legacy_single_server_variables_create_default_server() {
    let _env = EnvGuard::new(&[
        ("MCP_SERVER_URL", "http://legacy/mcp"),
        ("MCP_TOKEN", "legacy-token"),
    ]);
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "llm:\n  model: gpt-4o\n");

    let config = AppConfig::load(Some(&path)).expect("config loads");
    let server = config.default_mcp_server().expect("server from env");
    assert_eq!(server.name, "default");
    assert_eq!(server.server_url, "http://legacy/mcp");
    assert_eq!(server.token.as_deref(), Some("legacy-token"));
}

#[test]
#[serial]
fn invalid_environment_json_is_fatal() {
    let _env = EnvGuard::new(&[("MCP_SERVERS_JSON", "not json")]);
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), FULL_CONFIG);

    let err = AppConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "MCP_SERVERS_JSON"));
}

#[test]
#[serial]
fn malformed_yaml_reports_parse_error() {
    let _env = EnvGuard::new(&[]);
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "mcp_servers: [unclosed\n");

    let err = AppConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.user_message().contains("config.yaml"));
}

#[test]
#[serial]
fn servers_without_url_are_rejected() {
    let _env = EnvGuard::new(&[]);
    let dir = tempdir().expect("tempdir");
    let path = write_config(dir.path(), "mcp_servers:\n  - name: broken\n");

    let err = AppConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::MissingServerUrl { ref server } if server == "broken"));
}

#[test]
fn missing_servers_only_matter_when_required() {
    let config = AppConfig::from_yaml_with_env("llm:\n  model: gpt-4o\n", |_| None).expect("parses");
    assert!(config.mcp_servers.is_empty());
    assert!(matches!(
        config.require_mcp_servers(),
        Err(ConfigError::NoServersConfigured)
    ));
}

#[test]
fn task_files_load_and_report_errors() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("tasks.yaml");
    fs::write(
        &path,
        "version: '1'\ntasks:\n  - description: Check checkout errors\n    intent: Count error logs for checkout in the last hour\n",
    )
    .expect("write tasks");

    let file = TaskFile::load(&path).expect("tasks load");
    assert_eq!(file.tasks.len(), 1);
    assert_eq!(file.tasks[0].description, "Check checkout errors");

    fs::write(&path, "tasks: {not: [a list\n").expect("write tasks");
    assert!(matches!(TaskFile::load(&path), Err(ConfigError::TaskFile { .. })));
    assert!(matches!(
        TaskFile::load(&dir.path().join("absent.yaml")),
        Err(ConfigError::NotFound { .. })
    ));
}
