//! Typed view of the merged configuration document.
//!
//! Every section falls back to the defaults in [`super::defaults`], so an
//! empty `config.yml` is a valid configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub knowledge: KnowledgeConfig,
    pub responder: ResponderConfig,
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_secs: u64,
    /// Usually supplied through the environment or `secrets.yaml`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DEFAULT_BASE_URL.to_string(),
            model: defaults::DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: defaults::DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout_secs: defaults::DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_k: usize,
    pub tool_description: String,
    pub query_description: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: defaults::default_system_prompt(),
            temperature: 0.1,
            max_tokens: 1024,
            top_k: defaults::DEFAULT_TOP_K,
            tool_description: defaults::default_tool_description(),
            query_description: defaults::default_query_description(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub corpus_path: PathBuf,
    pub collection: String,
    /// Defaults to `<data dir>/knowledge.db`.
    pub db_path: Option<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separator: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            corpus_path: defaults::default_corpus_path(),
            collection: defaults::DEFAULT_COLLECTION.to_string(),
            db_path: None,
            chunk_size: defaults::DEFAULT_CHUNK_SIZE,
            chunk_overlap: defaults::DEFAULT_CHUNK_OVERLAP,
            separator: defaults::DEFAULT_SEPARATOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    pub temperature: f64,
    pub max_tokens: u32,
    pub fallback_temperature: f64,
    pub fallback_max_tokens: u32,
    pub intent_prompt: PathBuf,
    pub intent_list: PathBuf,
    pub chains: BTreeMap<String, Vec<ChainStepConfig>>,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 200,
            fallback_temperature: 0.9,
            fallback_max_tokens: 256,
            intent_prompt: defaults::default_intent_prompt(),
            intent_list: defaults::default_intent_list(),
            chains: defaults::default_chains(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStepConfig {
    pub template: PathBuf,
    pub output_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub callback_delay_ms: u64,
    pub timeout_secs: u64,
    /// Skips TLS certificate verification on callback delivery.
    pub accept_invalid_certs: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            callback_delay_ms: defaults::DEFAULT_CALLBACK_DELAY_MS,
            timeout_secs: defaults::DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: true,
        }
    }
}
