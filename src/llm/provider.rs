use async_trait::async_trait;

use super::types::{AssistantReply, ChatRequest};
use crate::core::errors::BotError;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// chat completion (non-streaming); may carry a function call instead of text
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<AssistantReply, BotError>;

    /// generate embeddings, one vector per input, in input order
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, BotError>;
}
