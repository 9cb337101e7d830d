use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("knowledge store is not ready: {0}")]
    NotReady(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for tool `{tool}`: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("unrecognized intent: {0:?}")]
    UnrecognizedIntent(String),
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
    #[error("missing configuration: {0}")]
    ConfigMissing(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BotError {
    pub fn upstream<E: std::fmt::Display>(err: E) -> Self {
        BotError::UpstreamFailure(err.to_string())
    }

    pub fn invalid_arguments(tool: &str, reason: impl Into<String>) -> Self {
        BotError::InvalidArguments {
            tool: tool.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors caused by a malformed tool call from the model rather than by
    /// the environment.
    pub fn is_tool_call_error(&self) -> bool {
        matches!(
            self,
            BotError::UnknownTool(_) | BotError::InvalidArguments { .. }
        )
    }
}

impl From<reqwest::Error> for BotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BotError::UpstreamFailure(format!("request timed out: {}", err))
        } else {
            BotError::UpstreamFailure(err.to_string())
        }
    }
}

impl From<sqlx::Error> for BotError {
    fn from(err: sqlx::Error) -> Self {
        BotError::UpstreamFailure(format!("vector store: {}", err))
    }
}
