use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::{ParamKind, ParameterSpec, Tool, ToolSignature};
use crate::core::config::defaults::KNOWLEDGE_TOOL_NAME;
use crate::core::errors::BotError;
use crate::rag::KnowledgeStore;

/// `query_to_vectordb(query)`: the nearest passages, joined with spaces.
pub struct KnowledgeSearchTool {
    store: Arc<KnowledgeStore>,
    top_k: usize,
    signature: ToolSignature,
}

impl KnowledgeSearchTool {
    pub fn new(
        store: Arc<KnowledgeStore>,
        top_k: usize,
        description: impl Into<String>,
        query_description: impl Into<String>,
    ) -> Self {
        Self {
            store,
            top_k,
            signature: ToolSignature {
                name: KNOWLEDGE_TOOL_NAME.to_string(),
                description: description.into(),
                parameters: vec![ParameterSpec {
                    name: "query".to_string(),
                    description: query_description.into(),
                    kind: ParamKind::String,
                    required: true,
                }],
            },
        }
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn signature(&self) -> &ToolSignature {
        &self.signature
    }

    async fn invoke(&self, arguments: &BTreeMap<String, String>) -> Result<String, BotError> {
        let query = arguments
            .get("query")
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| BotError::invalid_arguments(KNOWLEDGE_TOOL_NAME, "query is empty"))?;

        let matches = self.store.query(query, self.top_k).await?;
        tracing::info!(
            "Knowledge search for {:?} returned {} passages",
            query,
            matches.len()
        );

        Ok(matches
            .iter()
            .map(|hit| hit.passage.text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }
}
