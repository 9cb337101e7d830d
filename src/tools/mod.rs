//! Closed registry of tools the model may call by name.

mod knowledge_search;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::core::errors::BotError;
use crate::llm::{FunctionCall, FunctionDeclaration};

pub use knowledge_search::KnowledgeSearchTool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    /// Render a JSON value of this kind as its argument string.
    fn coerce(&self, value: &Value) -> Option<String> {
        match self {
            ParamKind::String => value.as_str().map(str::to_string),
            ParamKind::Integer => value.as_i64().map(|v| v.to_string()),
            ParamKind::Number => value.as_f64().map(|v| v.to_string()),
            ParamKind::Boolean => value.as_bool().map(|v| v.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterSpec {
    pub name: String,
    pub description: String,
    pub kind: ParamKind,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct ToolSignature {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

/// A function call whose arguments have been checked against the tool's
/// declared parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

impl ToolSignature {
    pub fn declaration(&self) -> FunctionDeclaration {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.kind.json_type(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name.as_str())
            .collect();

        FunctionDeclaration {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    pub fn decode_arguments(&self, raw: &str) -> Result<ToolCallRequest, BotError> {
        let raw = raw.trim();
        let object: Map<String, Value> = if raw.is_empty() {
            Map::new()
        } else {
            serde_json::from_str(raw).map_err(|err| {
                BotError::invalid_arguments(&self.name, format!("not a JSON object: {}", err))
            })?
        };

        if let Some(unexpected) = object
            .keys()
            .find(|key| !self.parameters.iter().any(|param| &param.name == *key))
        {
            return Err(BotError::invalid_arguments(
                &self.name,
                format!("unexpected parameter `{}`", unexpected),
            ));
        }

        let mut arguments = BTreeMap::new();
        for param in &self.parameters {
            match object.get(&param.name).filter(|value| !value.is_null()) {
                Some(value) => {
                    let text = param.kind.coerce(value).ok_or_else(|| {
                        BotError::invalid_arguments(
                            &self.name,
                            format!(
                                "parameter `{}` must be a {}",
                                param.name,
                                param.kind.json_type()
                            ),
                        )
                    })?;
                    arguments.insert(param.name.clone(), text);
                }
                None if param.required => {
                    return Err(BotError::invalid_arguments(
                        &self.name,
                        format!("missing required parameter `{}`", param.name),
                    ));
                }
                None => {}
            }
        }

        Ok(ToolCallRequest {
            name: self.name.clone(),
            arguments,
        })
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn signature(&self) -> &ToolSignature;

    async fn invoke(&self, arguments: &BTreeMap<String, String>) -> Result<String, BotError>;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), BotError> {
        let name = tool.signature().name.clone();
        if self.tools.contains_key(&name) {
            return Err(BotError::InvalidConfig(format!(
                "tool `{}` registered twice",
                name
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools
            .values()
            .map(|tool| tool.signature().declaration())
            .collect()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, BotError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| BotError::UnknownTool(name.to_string()))
    }

    /// Look up the called tool and decode the call's arguments.
    pub fn resolve(&self, call: &FunctionCall) -> Result<(Arc<dyn Tool>, ToolCallRequest), BotError> {
        let tool = self.get(&call.name)?;
        let request = tool.signature().decode_arguments(&call.arguments)?;
        Ok((tool, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> ToolSignature {
        ToolSignature {
            name: "lookup".to_string(),
            description: "Look something up".to_string(),
            parameters: vec![
                ParameterSpec {
                    name: "query".to_string(),
                    description: "what to look up".to_string(),
                    kind: ParamKind::String,
                    required: true,
                },
                ParameterSpec {
                    name: "limit".to_string(),
                    description: "max results".to_string(),
                    kind: ParamKind::Integer,
                    required: false,
                },
            ],
        }
    }

    struct Noop(ToolSignature);

    #[async_trait]
    impl Tool for Noop {
        fn signature(&self) -> &ToolSignature {
            &self.0
        }

        async fn invoke(&self, _arguments: &BTreeMap<String, String>) -> Result<String, BotError> {
            Ok(String::new())
        }
    }

    #[test]
    fn declaration_lists_properties_and_required() {
        let declaration = signature().declaration();
        assert_eq!(declaration.name, "lookup");
        assert_eq!(declaration.parameters["properties"]["query"]["type"], "string");
        assert_eq!(declaration.parameters["properties"]["limit"]["type"], "integer");
        assert_eq!(declaration.parameters["required"], json!(["query"]));
    }

    #[test]
    fn decodes_typed_arguments() {
        let request = signature()
            .decode_arguments(r#"{"query": "open chat", "limit": 3}"#)
            .unwrap();
        assert_eq!(request.arguments["query"], "open chat");
        assert_eq!(request.arguments["limit"], "3");
    }

    #[test]
    fn rejects_malformed_arguments() {
        let sig = signature();
        for raw in [
            "{not json",
            "[1, 2]",
            r#"{"limit": 2}"#,
            r#"{"query": 5}"#,
            r#"{"query": "x", "extra": true}"#,
        ] {
            let err = sig.decode_arguments(raw).unwrap_err();
            assert!(
                matches!(err, BotError::InvalidArguments { .. }),
                "expected InvalidArguments for {}",
                raw
            );
        }
    }

    #[test]
    fn registry_rejects_unknown_and_duplicate_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Noop(signature()))).unwrap();
        assert!(registry.register(Arc::new(Noop(signature()))).is_err());

        let call = FunctionCall {
            name: "delete_everything".to_string(),
            arguments: "{}".to_string(),
        };
        assert!(matches!(registry.resolve(&call), Err(BotError::UnknownTool(name)) if name == "delete_everything"));
        assert_eq!(registry.declarations().len(), 1);
    }
}
