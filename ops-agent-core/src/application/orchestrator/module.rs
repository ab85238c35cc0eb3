use super::errors::ModuleError;
use crate::domain::{ModuleResult, Params, SharedContext};
use async_trait::async_trait;

/// A unit of operational work the orchestrator can run.
///
/// Modules read from and write to the shared context; the orchestrator itself
/// records `{name}_result` after every run.
#[async_trait]
pub trait CheckModule: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Reject a call before any I/O happens.
    fn validate_params(&self, _params: &Params, _context: &SharedContext) -> Result<(), String> {
        Ok(())
    }

    async fn execute(
        &self,
        params: Params,
        context: &mut SharedContext,
    ) -> Result<ModuleResult, ModuleError>;
}
