use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AgentSettings, FunctionCallingAgent};
use crate::chat::ChatSession;
use crate::core::config::{AppPaths, BotConfig, ConfigService};
use crate::core::errors::BotError;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::{Chunker, KnowledgeStore, ProviderEmbedder};
use crate::responder::build_router;
use crate::tools::{KnowledgeSearchTool, ToolRegistry};
use crate::webhook::{CallbackDispatcher, WebhookResponder};

/// Outcome of an ingest run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks: usize,
    pub inserted: usize,
    pub total: usize,
}

/// Loaded configuration plus the shared LLM client; builds the components
/// each command needs.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<BotConfig>,
    pub provider: Arc<dyn LlmProvider>,
}

impl AppState {
    pub fn initialize(paths: Arc<AppPaths>) -> Result<Self, BotError> {
        let service = ConfigService::new(paths.clone());
        let config = service.load_bot_config()?;
        let api_key = service.api_key(&config)?;

        let provider = OpenAiProvider::new(
            &config.llm.base_url,
            api_key,
            Duration::from_secs(config.llm.timeout_secs),
        )?;
        tracing::info!(
            "Using {} at {} (chat: {}, embeddings: {})",
            provider.name(),
            config.llm.base_url,
            config.llm.model,
            config.llm.embedding_model
        );

        Ok(Self::with_provider(paths, config, Arc::new(provider)))
    }

    pub fn with_provider(
        paths: Arc<AppPaths>,
        config: BotConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            paths,
            config: Arc::new(config),
            provider,
        }
    }

    pub async fn open_store(&self) -> Result<Arc<KnowledgeStore>, BotError> {
        let knowledge = &self.config.knowledge;
        let db_path = knowledge
            .db_path
            .clone()
            .unwrap_or_else(|| self.paths.db_path.clone());
        let embedder = ProviderEmbedder::new(
            self.provider.clone(),
            self.config.llm.embedding_model.clone(),
        );

        let store = KnowledgeStore::open(&db_path, &knowledge.collection, Arc::new(embedder)).await?;
        Ok(Arc::new(store))
    }

    /// Chunk the corpus file and add its passages to the knowledge store.
    pub async fn ingest(&self, rebuild: bool) -> Result<IngestReport, BotError> {
        let knowledge = &self.config.knowledge;
        let corpus = std::fs::read_to_string(&knowledge.corpus_path).map_err(|err| {
            BotError::ConfigMissing(format!(
                "corpus {}: {}",
                knowledge.corpus_path.display(),
                err
            ))
        })?;

        let chunker = Chunker::new(
            knowledge.chunk_size,
            knowledge.chunk_overlap,
            knowledge.separator.clone(),
        )?;
        let passages: Vec<_> = chunker.passages(&corpus).collect();
        let chunks = passages.len();

        let store = self.open_store().await?;
        if rebuild {
            let removed = store.clear().await?;
            tracing::info!("Cleared {} passages from `{}`", removed, store.collection());
        }

        let inserted = store.build(passages).await?;
        let total = store.count().await?;
        tracing::info!(
            "Ingested {}: {} chunks, {} new, {} total",
            knowledge.corpus_path.display(),
            chunks,
            inserted,
            total
        );

        Ok(IngestReport {
            chunks,
            inserted,
            total,
        })
    }

    pub async fn chat_session(&self) -> Result<ChatSession, BotError> {
        let store = self.open_store().await?;
        if store.count().await? == 0 {
            tracing::warn!(
                "Knowledge base `{}` is empty; run `ingest` first",
                store.collection()
            );
        }

        let agent_config = &self.config.agent;
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(KnowledgeSearchTool::new(
            store,
            agent_config.top_k,
            agent_config.tool_description.clone(),
            agent_config.query_description.clone(),
        )))?;

        let agent = FunctionCallingAgent::new(
            self.provider.clone(),
            tools,
            AgentSettings::from_config(&self.config.llm, agent_config),
        );
        Ok(ChatSession::new(agent, &agent_config.system_prompt))
    }

    pub fn webhook_responder(&self) -> Result<WebhookResponder, BotError> {
        let router = build_router(self.provider.clone(), &self.config.llm, &self.config.responder)?;
        let dispatcher = CallbackDispatcher::from_config(&self.config.webhook)?;
        Ok(WebhookResponder::new(
            Arc::new(router),
            dispatcher,
            Duration::from_millis(self.config.webhook.callback_delay_ms),
        ))
    }
}
