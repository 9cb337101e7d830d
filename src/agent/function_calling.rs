use std::sync::Arc;

use crate::core::config::{AgentConfig, LlmConfig};
use crate::core::errors::BotError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};
use crate::tools::ToolRegistry;

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl AgentSettings {
    pub fn from_config(llm: &LlmConfig, agent: &AgentConfig) -> Self {
        Self {
            model: llm.model.clone(),
            temperature: agent.temperature,
            max_tokens: agent.max_tokens,
        }
    }
}

/// Runs one user turn against the model, executing at most one tool call.
pub struct FunctionCallingAgent {
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    settings: AgentSettings,
}

impl FunctionCallingAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: ToolRegistry, settings: AgentSettings) -> Self {
        Self {
            provider,
            tools,
            settings,
        }
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest::new(messages).with_sampling(self.settings.temperature, self.settings.max_tokens)
    }

    /// Answer the last user message in `transcript`.
    ///
    /// On success the assistant's messages (function call, function result,
    /// final answer) are appended in order. On error the transcript is left
    /// untouched.
    pub async fn respond(&self, transcript: &mut Vec<ChatMessage>) -> Result<String, BotError> {
        tracing::debug!("Agent transcript: {:?}", transcript);

        let first = self
            .provider
            .chat(
                self.request(transcript.clone())
                    .with_functions(self.tools.declarations()),
                &self.settings.model,
            )
            .await?;

        let Some(call) = first.function_call.clone() else {
            let answer = first.content_text();
            transcript.push(ChatMessage::assistant(answer.clone()));
            return Ok(answer);
        };

        let (tool, request) = self.tools.resolve(&call)?;
        tracing::info!("Model called `{}` with {:?}", request.name, request.arguments);
        let output = tool.invoke(&request.arguments).await?;

        let mut turn = transcript.clone();
        turn.push(ChatMessage::assistant_function_call(first.content_text(), call));
        turn.push(ChatMessage::function(request.name.clone(), output));

        let second = self
            .provider
            .chat(self.request(turn.clone()), &self.settings.model)
            .await?;
        if let Some(chained) = &second.function_call {
            tracing::warn!(
                "Ignoring chained call to `{}`; one tool call per turn",
                chained.name
            );
        }

        let answer = second.content_text();
        turn.push(ChatMessage::assistant(answer.clone()));
        *transcript = turn;
        Ok(answer)
    }
}
