use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::BotError;
use crate::llm::LlmProvider;

/// Turns text into vectors for the knowledge store.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, BotError>;
}

/// Embeds through an LLM provider's embedding endpoint with a fixed model.
pub struct ProviderEmbedder {
    provider: Arc<dyn LlmProvider>,
    model_id: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, BotError> {
        self.provider.embed(inputs, &self.model_id).await
    }
}
