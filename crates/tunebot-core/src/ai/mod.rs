pub mod openai;

use async_trait::async_trait;

use crate::error::ChatError;

pub use openai::{parse_completion, ChatRequest, OpenAIClient};

/// Sends one chat-completion request and returns the reply text
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError>;
}
