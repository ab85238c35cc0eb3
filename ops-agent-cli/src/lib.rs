pub mod cli;
pub mod error;

pub use cli::{Cli, Command};
pub use error::CliError;

use ops_agent_core::application::agent::AgentError;
use ops_agent_core::application::anomaly::{AnomalyAnalyzer, load_alarm};
use ops_agent_core::config::{TaskFile, ensure_env_loaded};
use ops_agent_core::constants::DEFAULT_SERVER_ALIAS;
use ops_agent_core::{
    AgentOptions, AppConfig, CheckPipeline, ConfigError, Params, RunOptions, RunReport, server,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_TASKS_FILE: &str = "config/tasks.yaml";

pub async fn run(cli: Cli) -> Result<(), CliError> {
    init_tracing(cli.verbose);
    ensure_env_loaded();
    debug!(command = ?cli.command, config = ?cli.config, "CLI arguments parsed");

    let config = AppConfig::load(cli.config.as_deref())?;
    info!(
        servers = config.mcp_servers.len(),
        workflow_steps = config.workflow.len(),
        queries = config.queries.len(),
        "Configuration loaded"
    );

    match cli.command {
        Command::Run { summary, notify } => {
            if config.workflow.is_empty() && config.queries.is_empty() {
                return Err(ConfigError::NothingToRun.into());
            }
            config.require_mcp_servers()?;
            let pipeline = CheckPipeline::from_config(config);
            let options = RunOptions {
                summary,
                notify,
                ..RunOptions::default()
            };
            let report = pipeline.run(options).await;
            finish(&report, &cli.output)
        }
        Command::Agent {
            tasks,
            max_iterations,
            server,
        } => {
            config.require_mcp_servers()?;
            let path = tasks
                .or_else(|| config.agent.tasks_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TASKS_FILE));
            let file = TaskFile::load(&path).map_err(AgentError::TaskFile)?;
            if file.tasks.is_empty() {
                return Err(AgentError::NoTasks.into());
            }
            let options = AgentOptions {
                max_iterations: max_iterations.unwrap_or(config.agent.max_iterations),
                server: server.unwrap_or_else(|| DEFAULT_SERVER_ALIAS.to_string()),
            };
            info!(tasks = file.tasks.len(), max_iterations = options.max_iterations, "Starting agent");
            let pipeline = CheckPipeline::from_config(config);
            let report = pipeline.run_agent(&file.tasks, options).await;
            finish(&report, &cli.output)
        }
        Command::Alarm { file, min_confidence } => {
            let alarm = load_alarm(&file)?;
            let analyzer = min_confidence
                .map_or_else(AnomalyAnalyzer::default, AnomalyAnalyzer::with_min_confidence);
            let pipeline = CheckPipeline::from_config(config);
            let report = pipeline.run_alarm(&alarm, analyzer);
            finish(&report, &cli.output)
        }
        Command::Module { name, params } => {
            let params = parse_object("params", params.as_deref())?;
            let pipeline = CheckPipeline::from_config(config);
            let report = pipeline.run_module(&name, params).await?;
            finish(&report, &cli.output)
        }
        Command::Tools { server } => {
            config.require_mcp_servers()?;
            let server = server.unwrap_or_else(|| DEFAULT_SERVER_ALIAS.to_string());
            let pipeline = CheckPipeline::from_config(config);
            let tools = pipeline.tools().list_tools(&server).await?;
            println!("{} tool(s) on {server}:", tools.len());
            for tool in tools {
                let required = tool.required_params();
                let description = tool.description.as_deref().unwrap_or("");
                if required.is_empty() {
                    println!("- {}: {description}", tool.name);
                } else {
                    println!("- {}: {description} (required: {})", tool.name, required.join(", "));
                }
            }
            Ok(())
        }
        Command::Call { tool, args, server } => {
            config.require_mcp_servers()?;
            let arguments = parse_object("args", args.as_deref())?;
            let server = server.unwrap_or_else(|| DEFAULT_SERVER_ALIAS.to_string());
            let pipeline = CheckPipeline::from_config(config);
            let result = pipeline
                .tools()
                .invoke_tool(&server, &tool, Value::Object(arguments))
                .await?;
            let rendered = serde_json::to_string_pretty(&result.to_value()).unwrap_or_default();
            println!("{rendered}");
            if result.is_error {
                warn!(tool = %tool, "Tool reported an error");
            }
            Ok(())
        }
        Command::Serve { addr } => {
            let addr = match addr {
                Some(addr) => addr,
                None => config.server.socket_addr()?,
            };
            let pipeline = CheckPipeline::from_config(config);
            server::serve(pipeline, addr).await?;
            Ok(())
        }
    }
}

/// Parse an optional JSON object flag; absent means empty.
pub fn parse_object(flag: &'static str, raw: Option<&str>) -> Result<Params, CliError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Params::new());
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(CliError::InvalidJson {
            flag,
            reason: "expected a JSON object".to_string(),
        }),
        Err(err) => Err(CliError::InvalidJson {
            flag,
            reason: err.to_string(),
        }),
    }
}

fn finish(report: &RunReport, output: &Path) -> Result<(), CliError> {
    report.write_to(output).map_err(|source| CliError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    println!("{}", report.output);
    info!(
        path = %output.display(),
        success = report.is_success(),
        "Run finished"
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let default_level = if verbose { "debug" } else { "info" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_object_accepts_objects_only() {
        assert!(parse_object("params", None).unwrap().is_empty());
        assert!(parse_object("params", Some("  ")).unwrap().is_empty());
        let params = parse_object("params", Some(r#"{"service_name":"checkout"}"#)).unwrap();
        assert_eq!(params["service_name"], "checkout");
        assert!(matches!(
            parse_object("args", Some("[1,2]")),
            Err(CliError::InvalidJson { flag: "args", .. })
        ));
        assert!(parse_object("args", Some("{broken")).is_err());
    }

    #[test]
    fn finish_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let mut report = RunReport::new();
        report.output = "ok".into();
        finish(&report, &path).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["output"], "ok");
    }
}
