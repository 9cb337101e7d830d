use crate::agent::FunctionCallingAgent;
use crate::llm::ChatMessage;

pub const APOLOGY: &str =
    "Sorry, I couldn't handle that request. Could you try asking in a different way?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The assistant answered.
    Reply(String),
    /// The turn failed; the message was recorded as an assistant message.
    Failed(String),
    /// Blank input, nothing was sent.
    Skipped,
    /// The user asked to end the session.
    Quit,
}

/// One conversation with the knowledge-base agent. Turns run one at a time
/// because `submit` takes `&mut self`.
pub struct ChatSession {
    agent: FunctionCallingAgent,
    transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(agent: FunctionCallingAgent, system_prompt: &str) -> Self {
        Self {
            agent,
            transcript: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub async fn submit(&mut self, input: &str) -> TurnOutcome {
        let input = input.trim();
        if input.is_empty() {
            return TurnOutcome::Skipped;
        }
        if input.eq_ignore_ascii_case("quit") {
            return TurnOutcome::Quit;
        }

        self.transcript.push(ChatMessage::user(input));

        match self.agent.respond(&mut self.transcript).await {
            Ok(answer) => TurnOutcome::Reply(answer),
            Err(err) => {
                let message = if err.is_tool_call_error() {
                    tracing::warn!("Malformed tool call from model: {}", err);
                    APOLOGY.to_string()
                } else {
                    tracing::error!("Chat turn failed: {}", err);
                    format!("Error: {}", err)
                };
                self.transcript.push(ChatMessage::assistant(message.clone()));
                TurnOutcome::Failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::AgentSettings;
    use crate::llm::{AssistantReply, Role};
    use crate::test_support::ScriptedProvider;
    use crate::tools::ToolRegistry;

    fn session(provider: ScriptedProvider) -> ChatSession {
        let agent = FunctionCallingAgent::new(
            Arc::new(provider),
            ToolRegistry::new(),
            AgentSettings {
                model: "gpt-3.5-turbo".to_string(),
                temperature: 0.1,
                max_tokens: 1024,
            },
        );
        ChatSession::new(agent, "system prompt")
    }

    #[tokio::test]
    async fn reply_is_recorded_after_user_message() {
        let mut chat = session(ScriptedProvider::texts(&["hello there"]));

        let outcome = chat.submit("  hi  ").await;

        assert_eq!(outcome, TurnOutcome::Reply("hello there".to_string()));
        let roles: Vec<Role> = chat.transcript().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(chat.transcript()[1].content, "hi");
    }

    #[tokio::test]
    async fn quit_ends_without_calling_the_model() {
        let mut chat = session(ScriptedProvider::default());

        assert_eq!(chat.submit("QUIT").await, TurnOutcome::Quit);
        assert_eq!(chat.submit("   ").await, TurnOutcome::Skipped);
        assert_eq!(chat.transcript().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_an_apology() {
        let mut chat = session(ScriptedProvider::new(vec![AssistantReply::call(
            "query_to_vectordb",
            "{}",
        )]));

        let outcome = chat.submit("where is the manual?").await;

        assert_eq!(outcome, TurnOutcome::Failed(APOLOGY.to_string()));
        let last = chat.transcript().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, APOLOGY);
    }

    #[tokio::test]
    async fn upstream_failure_is_shown_inline() {
        let provider = ScriptedProvider::default();
        provider.push_failure("connection reset");
        let mut chat = session(provider);

        let TurnOutcome::Failed(message) = chat.submit("hello").await else {
            panic!("expected a failed turn");
        };

        assert!(message.starts_with("Error: "));
        assert!(message.contains("connection reset"));
        assert_eq!(chat.transcript().len(), 3);
    }
}
