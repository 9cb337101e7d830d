pub mod defaults;
pub mod paths;
pub mod service;
pub mod types;
pub mod validation;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use types::{
    AgentConfig, BotConfig, ChainStepConfig, KnowledgeConfig, LlmConfig, ResponderConfig,
    WebhookConfig,
};
