//! Intent-routed replies for the webhook channel.

pub mod classifier;
pub mod prompt;
pub mod router;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::config::{LlmConfig, ResponderConfig};
use crate::core::errors::BotError;
use crate::llm::LlmProvider;

pub use classifier::{extract_label, Intent, IntentClassifier, IntentSet};
pub use prompt::{PromptContext, PromptTemplate};
pub use router::{ChainStep, ResponseChain, ResponseChainRouter, STEP_SEPARATOR};

/// Model and sampling for a single completion.
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Load the intent prompt, intent list and chain templates named in config.
pub fn build_router(
    provider: Arc<dyn LlmProvider>,
    llm: &LlmConfig,
    config: &ResponderConfig,
) -> Result<ResponseChainRouter, BotError> {
    let settings = CompletionSettings {
        model: llm.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let fallback = CompletionSettings {
        model: llm.model.clone(),
        temperature: config.fallback_temperature,
        max_tokens: config.fallback_max_tokens,
    };

    let classifier = IntentClassifier::new(
        provider.clone(),
        PromptTemplate::load(&config.intent_prompt)?,
        IntentSet::load(&config.intent_list)?,
        settings.clone(),
    )?;

    let mut chains = BTreeMap::new();
    for (intent, steps) in &config.chains {
        let steps = steps
            .iter()
            .map(|step| -> Result<ChainStep, BotError> {
                Ok(ChainStep {
                    template: PromptTemplate::load(&step.template)?,
                    output_key: step.output_key.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        chains.insert(intent.clone(), ResponseChain::new(steps)?);
    }

    tracing::info!(
        "Responder ready: {} intents, chains for {:?}",
        classifier.intents().labels().len(),
        chains.keys().collect::<Vec<_>>()
    );

    ResponseChainRouter::new(provider, classifier, chains, settings, fallback)
}
