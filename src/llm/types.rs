use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

/// A function call exactly as the model emitted it; `arguments` is
/// JSON-encoded text that has not been checked yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            function_call: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn function(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::plain(Role::Function, content)
        }
    }

    pub fn assistant_function_call(content: impl Into<String>, call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn is_function_call(&self) -> bool {
        self.role == Role::Assistant && self.function_call.is_some()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Declaration of a callable tool in the shape the completions API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub functions: Vec<FunctionDeclaration>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
            functions: Vec::new(),
        }
    }

    pub fn with_sampling(mut self, temperature: f64, max_tokens: u32) -> Self {
        self.temperature = Some(temperature);
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_functions(mut self, functions: Vec<FunctionDeclaration>) -> Self {
        self.functions = functions;
        self
    }
}

/// The assistant's side of one completion: text, a function call, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            function_call: None,
        }
    }

    pub fn call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            content: None,
            function_call: Some(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }

    pub fn content_text(&self) -> String {
        self.content.clone().unwrap_or_default()
    }
}
