use super::types::{ChatRequest, ChatResponse, LlmError};
use async_trait::async_trait;

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, LlmError>;
}
