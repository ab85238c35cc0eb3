//! Built-in check modules.

mod error_log_query;
mod llm_chat;
mod notify;
mod ops_summary;
mod params;
mod upstream_query;

pub use error_log_query::{ERROR_LOG_QUERY, ErrorLogQueryModule, default_error_query};
pub use llm_chat::{LLM_CHAT, LlmChatModule};
pub use notify::{NOTIFY, NOTIFY_KEY_CONTEXT, NotifyModule};
pub use ops_summary::{OPS_SUMMARY, OpsSummaryModule};
pub use upstream_query::{UPSTREAM_QUERY, UpstreamQueryModule};

use crate::application::orchestrator::Orchestrator;
use crate::infrastructure::llm::ChatModel;
use crate::infrastructure::mcp::ToolServerInterface;
use crate::infrastructure::notify::WebhookNotifier;
use std::sync::Arc;

/// Register every built-in module on `orchestrator`.
pub fn register_builtin_modules(
    orchestrator: &mut Orchestrator,
    tools: Arc<dyn ToolServerInterface>,
    llm: Arc<dyn ChatModel>,
    notifier: WebhookNotifier,
) {
    orchestrator.register_module(Arc::new(UpstreamQueryModule::new(tools.clone())));
    orchestrator.register_module(Arc::new(ErrorLogQueryModule::new(tools)));
    orchestrator.register_module(Arc::new(LlmChatModule::new(llm.clone())));
    orchestrator.register_module(Arc::new(OpsSummaryModule::new(Some(llm))));
    orchestrator.register_module(Arc::new(NotifyModule::new(notifier)));
}
