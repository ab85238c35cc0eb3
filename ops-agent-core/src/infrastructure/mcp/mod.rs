mod client;
mod error;
mod interface;
mod manager;

pub use client::McpHttpClient;
pub use error::McpError;
pub use interface::{ToolCallResult, ToolDescriptor, ToolServerInterface};
pub use manager::ServerManager;
