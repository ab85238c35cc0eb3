pub mod agent;
pub mod anomaly;
pub mod modules;
pub mod orchestrator;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod trigger;

pub use pipeline::{CheckPipeline, RunOptions};
pub use report::{RunReport, RunSummary};
