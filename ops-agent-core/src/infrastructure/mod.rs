pub mod llm;
pub mod mcp;
pub mod notify;
pub mod server;
