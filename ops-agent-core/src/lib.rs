pub mod application;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;

pub use application::agent::{AgentOptions, AgentRunner, TaskReport, TaskStatus};
pub use application::orchestrator::{CheckModule, ModuleError, Orchestrator, OrchestratorError};
pub use application::query::{QueryExecutor, QueryOutcome};
pub use application::{CheckPipeline, RunOptions, RunReport};
pub use config::{AppConfig, ConfigError};
pub use domain::{ModuleResult, ModuleStatus, Params, SharedContext};
pub use infrastructure::{llm, mcp, notify, server};

/// Single-line preview of `text` for log fields, capped at 160 characters.
pub fn summarise(text: &str) -> String {
    const SNIPPET_LIMIT: usize = 160;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "(empty)".to_string();
    }
    let single_line = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = single_line.chars();
    let mut result: String = chars.by_ref().take(SNIPPET_LIMIT).collect();
    if chars.next().is_some() {
        result.push('…');
    }
    result
}
