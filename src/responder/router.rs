use std::collections::BTreeMap;
use std::sync::Arc;

use super::classifier::{Intent, IntentClassifier, BASE_FIELDS};
use super::prompt::PromptTemplate;
use super::CompletionSettings;
use crate::core::errors::BotError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Separator between the outputs of a multi-step chain.
pub const STEP_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
pub struct ChainStep {
    pub template: PromptTemplate,
    pub output_key: String,
}

/// Prompts run in order; each step sees the outputs of the steps before it.
#[derive(Debug, Clone)]
pub struct ResponseChain {
    steps: Vec<ChainStep>,
}

impl ResponseChain {
    pub fn new(steps: Vec<ChainStep>) -> Result<Self, BotError> {
        if steps.is_empty() {
            return Err(BotError::InvalidConfig(
                "response chain has no steps".to_string(),
            ));
        }

        let mut available: Vec<&str> = BASE_FIELDS.to_vec();
        available.push("intent");
        for step in &steps {
            step.template.check_fields(available.iter().copied())?;
            if available.contains(&step.output_key.as_str()) {
                return Err(BotError::InvalidConfig(format!(
                    "output key `{}` is already in use",
                    step.output_key
                )));
            }
            available.push(&step.output_key);
        }

        Ok(Self { steps })
    }
}

/// Classifies a message and answers it with the chain registered for its
/// intent, or a single free-form completion when none applies.
pub struct ResponseChainRouter {
    provider: Arc<dyn LlmProvider>,
    classifier: IntentClassifier,
    chains: BTreeMap<String, ResponseChain>,
    settings: CompletionSettings,
    fallback: CompletionSettings,
}

impl ResponseChainRouter {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        classifier: IntentClassifier,
        chains: BTreeMap<String, ResponseChain>,
        settings: CompletionSettings,
        fallback: CompletionSettings,
    ) -> Result<Self, BotError> {
        let chains: BTreeMap<String, ResponseChain> = chains
            .into_iter()
            .map(|(intent, chain)| (intent.to_lowercase(), chain))
            .collect();

        for intent in chains.keys() {
            if classifier.intents().lookup(intent).is_none() {
                return Err(BotError::InvalidConfig(format!(
                    "chain registered for `{}`, which is not in the intent list",
                    intent
                )));
            }
        }

        Ok(Self {
            provider,
            classifier,
            chains,
            settings,
            fallback,
        })
    }

    pub async fn respond(&self, user_message: &str) -> Result<String, BotError> {
        let intent = match self.classifier.classify(user_message).await {
            Ok(intent) => Some(intent),
            Err(BotError::UnrecognizedIntent(label)) => {
                tracing::warn!("Unrecognized intent {:?}; using the default reply", label);
                None
            }
            Err(err) => return Err(err),
        };

        match intent.and_then(|intent| self.chains.get(intent.as_str()).map(|chain| (intent, chain))) {
            Some((intent, chain)) => {
                tracing::info!("Routing to `{}` chain ({} steps)", intent, chain.steps.len());
                self.run_chain(&intent, chain, user_message).await
            }
            None => {
                tracing::info!("Routing to default reply");
                self.complete(user_message.to_string(), &self.fallback).await
            }
        }
    }

    async fn run_chain(
        &self,
        intent: &Intent,
        chain: &ResponseChain,
        user_message: &str,
    ) -> Result<String, BotError> {
        let mut context = self.classifier.base_context(user_message);
        context.insert("intent".to_string(), intent.to_string());

        let mut outputs = Vec::with_capacity(chain.steps.len());
        for step in &chain.steps {
            let prompt = step.template.render(&context)?;
            let output = self.complete(prompt, &self.settings).await?;
            tracing::debug!("Step `{}` produced {} chars", step.output_key, output.len());
            context.insert(step.output_key.clone(), output.clone());
            outputs.push(output);
        }

        Ok(outputs.join(STEP_SEPARATOR))
    }

    async fn complete(&self, prompt: String, settings: &CompletionSettings) -> Result<String, BotError> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_sampling(settings.temperature, settings.max_tokens);
        let reply = self.provider.chat(request, &settings.model).await?;
        Ok(reply.content_text().trim().to_string())
    }
}
