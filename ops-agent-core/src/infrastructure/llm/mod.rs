mod client;
mod traits;
mod types;

pub use client::LlmClient;
pub use traits::ChatModel;
pub use types::{ChatRequest, ChatResponse, LlmError};
