use serde::{Deserialize, Serialize};

pub const CALLBACK_VERSION: &str = "2.0";

/// Inbound skill request. Only the fields the bot reads are modelled;
/// everything else in the body is ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkillRequest {
    pub user_request: UserRequest,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    #[serde(default)]
    pub utterance: String,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl SkillRequest {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// The callback URL, if present and non-blank.
    pub fn callback_url(&self) -> Option<&str> {
        self.user_request
            .callback_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackPayload {
    pub version: String,
    pub template: CallbackTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackTemplate {
    pub outputs: Vec<CallbackOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallbackOutput {
    #[serde(rename = "simpleText")]
    pub simple_text: SimpleText,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimpleText {
    pub text: String,
}

impl CallbackPayload {
    pub fn simple_text(text: impl Into<String>) -> Self {
        Self {
            version: CALLBACK_VERSION.to_string(),
            template: CallbackTemplate {
                outputs: vec![CallbackOutput {
                    simple_text: SimpleText { text: text.into() },
                }],
            },
        }
    }
}
