pub mod context;
pub mod result;
pub mod types;

pub use context::SharedContext;
pub use result::{ModuleResult, ModuleStatus, Params};
pub use types::{ChatMessage, MessageRole};
