pub mod app;
pub mod duration;
pub mod error;
pub mod llm;
pub mod loader;
pub mod mcp;
pub mod settings;
pub mod tasks;
pub mod workflow;

pub use app::AppConfig;
pub use duration::parse_duration;
pub use error::ConfigError;
pub use llm::{ApiFormat, LlmConfig};
pub use loader::ensure_env_loaded;
pub use mcp::McpServerConfig;
pub use settings::{AgentSettings, HttpConfig, NotifyConfig, QuerySettings, QuerySpec};
pub use tasks::{TaskFile, TaskSpec, task_slug};
pub use workflow::{StepCondition, WorkflowStep};
