mod errors;
mod models;
mod parser;
mod prompts;
mod runner;


pub use errors::AgentError;
pub use models::{
    AgentOptions, Attempt, Observation, Plan, PlannedCall, TaskReport, TaskStatus, Verdict,
};
pub use parser::{parse_plan, parse_verdict};
pub use runner::AgentRunner;
