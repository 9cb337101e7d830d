use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::prompt::{PromptContext, PromptTemplate};
use super::CompletionSettings;
use crate::core::errors::BotError;
use crate::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Fields every responder prompt can reference.
pub const BASE_FIELDS: [&str; 3] = ["user_message", "input", "intent_list"];

/// A label from the configured intent set, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Intent(String);

impl Intent {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of intent labels, plus the listing text shown to the model.
#[derive(Debug, Clone)]
pub struct IntentSet {
    labels: Vec<String>,
    listing: String,
}

impl IntentSet {
    /// One intent per line: `label` or `label: description`, optionally
    /// bulleted with `-` or `*`. Blank lines and `#` comments are skipped.
    pub fn parse(listing: &str) -> Result<Self, BotError> {
        let mut labels: Vec<String> = Vec::new();
        for line in listing.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.trim_start_matches(['-', '*']).trim_start();
            let label = line.split(':').next().unwrap_or_default().trim().to_lowercase();
            if !label.is_empty() && !labels.contains(&label) {
                labels.push(label);
            }
        }

        if labels.is_empty() {
            return Err(BotError::InvalidConfig(
                "intent list defines no intents".to_string(),
            ));
        }

        Ok(Self {
            labels,
            listing: listing.trim_end().to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, BotError> {
        let listing = fs::read_to_string(path).map_err(|err| {
            BotError::ConfigMissing(format!("intent list {}: {}", path.display(), err))
        })?;
        Self::parse(&listing)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn listing(&self) -> &str {
        &self.listing
    }

    pub fn lookup(&self, label: &str) -> Option<Intent> {
        let label = label.to_lowercase();
        self.labels
            .iter()
            .find(|known| **known == label)
            .map(|known| Intent(known.clone()))
    }
}

/// Pull the bare label out of a classification reply: first non-empty line,
/// without an `intent:` prefix, quotes, or trailing punctuation.
pub fn extract_label(reply: &str) -> String {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    let line = match line.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("intent:") => line[7..].trim_start(),
        _ => line,
    };

    line.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '.' | ',' | '!' | ';')
    })
    .to_string()
}

/// Asks the model which intent a message carries.
pub struct IntentClassifier {
    provider: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    intents: IntentSet,
    settings: CompletionSettings,
}

impl IntentClassifier {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        template: PromptTemplate,
        intents: IntentSet,
        settings: CompletionSettings,
    ) -> Result<Self, BotError> {
        template.check_fields(BASE_FIELDS)?;
        Ok(Self {
            provider,
            template,
            intents,
            settings,
        })
    }

    pub fn intents(&self) -> &IntentSet {
        &self.intents
    }

    /// Values shared by the classification prompt and every chain step.
    pub fn base_context(&self, user_message: &str) -> PromptContext {
        let mut context = PromptContext::new();
        context.insert("user_message".to_string(), user_message.to_string());
        context.insert("input".to_string(), user_message.to_string());
        context.insert("intent_list".to_string(), self.intents.listing().to_string());
        context
    }

    pub async fn classify(&self, user_message: &str) -> Result<Intent, BotError> {
        let prompt = self.template.render(&self.base_context(user_message))?;
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_sampling(self.settings.temperature, self.settings.max_tokens);

        let reply = self.provider.chat(request, &self.settings.model).await?;
        let label = extract_label(&reply.content_text());
        tracing::debug!("Intent reply {:?} parsed as {:?}", reply.content, label);

        self.intents
            .lookup(&label)
            .ok_or(BotError::UnrecognizedIntent(label))
    }
}
