use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::LlmProvider;
use super::types::{AssistantReply, ChatRequest, FunctionCall};
use crate::core::errors::BotError;

/// Client for an OpenAI-compatible `/v1` API.
#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, BotError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(BotError::upstream)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<AssistantReply, BotError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
            if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
            if !request.functions.is_empty() {
                obj.insert("functions".to_string(), json!(request.functions));
                obj.insert("function_call".to_string(), json!("auto"));
            }
        }

        tracing::debug!(
            "chat completion: model={}, messages={}, functions={}",
            model_id,
            request.messages.len(),
            request.functions.len()
        );

        let res = self.client.post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(BotError::UpstreamFailure(format!(
                "chat completion returned {}: {}",
                status, text
            )));
        }

        let payload: CompletionResponse = res.json().await?;
        let message = payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| BotError::UpstreamFailure("chat completion returned no choices".to_string()))?;

        Ok(AssistantReply {
            content: message.content,
            function_call: message.function_call,
        })
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, BotError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self.client.post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(BotError::UpstreamFailure(format!(
                "embedding request returned {}: {}",
                status, text
            )));
        }

        let mut payload: EmbeddingResponse = res.json().await?;
        if payload.data.len() != inputs.len() {
            return Err(BotError::UpstreamFailure(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                payload.data.len()
            )));
        }
        payload.data.sort_by_key(|item| item.index);

        Ok(payload.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    use super::*;
    use crate::llm::types::ChatMessage;
    use crate::llm::FunctionDeclaration;
    use crate::test_support::spawn_server;

    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn record(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let wants_function = body.get("functions").is_some();
        seen.lock().unwrap().push((auth, body));

        if wants_function {
            Json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "function_call": { "name": "query_to_vectordb", "arguments": "{\"query\":\"open chat\"}" }
                    }
                }]
            }))
        } else {
            Json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "plain answer" } }]
            }))
        }
    }

    async fn embeddings(Json(body): Json<Value>) -> Json<Value> {
        let count = body["input"].as_array().map(|a| a.len()).unwrap_or(0);
        // reversed order exercises the index sort
        let data: Vec<Value> = (0..count)
            .rev()
            .map(|i| json!({ "index": i, "embedding": [i as f32, 1.0] }))
            .collect();
        Json(json!({ "data": data }))
    }

    async fn provider_with_server() -> (OpenAiProvider, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/v1/chat/completions", post(record))
            .route("/v1/embeddings", post(embeddings))
            .with_state(seen.clone());
        let base = spawn_server(app).await;
        let provider =
            OpenAiProvider::new(&format!("{}/", base), "sk-test".to_string(), Duration::from_secs(5))
                .unwrap();
        (provider, seen)
    }

    #[tokio::test]
    async fn chat_sends_functions_and_parses_function_call() {
        let (provider, seen) = provider_with_server().await;
        let declaration = FunctionDeclaration {
            name: "query_to_vectordb".to_string(),
            description: "search".to_string(),
            parameters: json!({ "type": "object", "properties": {} }),
        };
        let request = ChatRequest::new(vec![ChatMessage::user("how do I open a chat?")])
            .with_sampling(0.1, 1024)
            .with_functions(vec![declaration]);

        let reply = provider.chat(request, "gpt-3.5-turbo").await.unwrap();

        let call = reply.function_call.expect("function call");
        assert_eq!(call.name, "query_to_vectordb");
        assert_eq!(call.arguments, "{\"query\":\"open chat\"}");
        assert!(reply.content.is_none());

        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["function_call"], "auto");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn chat_without_functions_omits_declarations() {
        let (provider, seen) = provider_with_server().await;
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);

        let reply = provider.chat(request, "gpt-3.5-turbo").await.unwrap();

        assert_eq!(reply.content.as_deref(), Some("plain answer"));
        let seen = seen.lock().unwrap();
        assert!(seen[0].1.get("functions").is_none());
        assert!(seen[0].1.get("temperature").is_none());
    }

    #[tokio::test]
    async fn embed_returns_vectors_in_input_order() {
        let (provider, _) = provider_with_server().await;
        let inputs = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let vectors = provider.embed(&inputs, "text-embedding-3-small").await.unwrap();

        assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 1.0], vec![2.0, 1.0]]);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_upstream_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = OpenAiProvider::new(
            &format!("http://{}", addr),
            "sk-test".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = provider
            .chat(ChatRequest::new(vec![ChatMessage::user("hi")]), "gpt-3.5-turbo")
            .await
            .unwrap_err();

        assert!(matches!(err, BotError::UpstreamFailure(_)));
    }
}
