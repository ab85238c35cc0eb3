use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ops-agent",
    version,
    about = "Operational checks over MCP tools with optional LLM summaries"
)]
pub struct Cli {
    /// Path to the YAML config (default: config/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Where the run report is written
    #[arg(long, global = true, default_value = "results.json")]
    pub output: PathBuf,
    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the configured workflow and queries
    Run {
        /// Ask the LLM for a summary of query results
        #[arg(long)]
        summary: bool,
        /// Send the report to the notification webhook
        #[arg(long)]
        notify: bool,
    },
    /// Run tasks through the plan/act/observe/evaluate loop
    Agent {
        /// Task file (default: agent.tasks_file from config)
        #[arg(long)]
        tasks: Option<PathBuf>,
        #[arg(long)]
        max_iterations: Option<usize>,
        /// MCP server used for tool discovery
        #[arg(long)]
        server: Option<String>,
    },
    /// Classify an alarm file (JSON or plain text) and report anomaly points
    Alarm {
        #[arg(default_value = "input.txt")]
        file: PathBuf,
        /// Drop anomaly points below this confidence (0.0 to 1.0)
        #[arg(long)]
        min_confidence: Option<f64>,
    },
    /// Execute one registered module
    Module {
        name: String,
        /// Module parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
    },
    /// List tools exposed by an MCP server
    Tools {
        #[arg(long)]
        server: Option<String>,
    },
    /// Call a single MCP tool
    Call {
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long)]
        args: Option<String>,
        #[arg(long)]
        server: Option<String>,
    },
    /// Start the HTTP trigger server
    Serve {
        /// Listen address (default: server.host/server.port from config)
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}
