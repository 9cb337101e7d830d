//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::Router;

use crate::core::errors::BotError;
use crate::llm::{AssistantReply, ChatRequest, LlmProvider};
use crate::rag::Embedder;

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Replays canned replies in order and records every request it receives.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<AssistantReply, String>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<AssistantReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|text| AssistantReply::text(*text)).collect())
    }

    pub fn push_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<AssistantReply, BotError> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(BotError::UpstreamFailure(message)),
            None => Err(BotError::UpstreamFailure("script exhausted".to_string())),
        }
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, BotError> {
        Ok(inputs.iter().map(|text| letter_histogram(text)).collect())
    }
}

/// Embeds text as a 26-dimension letter histogram.
#[derive(Default)]
pub struct LetterEmbedder {
    calls: Mutex<usize>,
    embedded: Mutex<usize>,
}

impl LetterEmbedder {
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    pub fn embedded(&self) -> usize {
        *self.embedded.lock().unwrap()
    }
}

#[async_trait]
impl Embedder for LetterEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, BotError> {
        *self.calls.lock().unwrap() += 1;
        *self.embedded.lock().unwrap() += inputs.len();
        Ok(inputs.iter().map(|text| letter_histogram(text)).collect())
    }
}

pub fn letter_histogram(text: &str) -> Vec<f32> {
    let mut counts = vec![0.0f32; 26];
    for ch in text.chars().filter(|c| c.is_ascii_alphabetic()) {
        counts[(ch.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    counts
}
