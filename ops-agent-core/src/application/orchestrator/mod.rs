mod errors;
mod module;
mod orchestrator;


pub use errors::{ModuleError, OrchestratorError};
pub use module::CheckModule;
pub use orchestrator::{Orchestrator, OrchestratorSummary};
