use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::dispatcher::CallbackDispatcher;
use super::payload::{CallbackPayload, SkillRequest};
use crate::core::errors::BotError;
use crate::responder::ResponseChainRouter;

/// Result of handling one skill request. The callback, if any, is already
/// running in the background.
#[derive(Debug)]
pub struct CallbackTask {
    answer: String,
    handle: Option<JoinHandle<()>>,
}

impl CallbackTask {
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn is_scheduled(&self) -> bool {
        self.handle.is_some()
    }

    /// Wait for the background callback to finish.
    pub async fn wait(self) {
        if let Some(handle) = self.handle {
            if let Err(err) = handle.await {
                tracing::error!("Callback task panicked or was cancelled: {}", err);
            }
        }
    }
}

pub struct WebhookResponder {
    router: Arc<ResponseChainRouter>,
    dispatcher: CallbackDispatcher,
    delay: Duration,
}

impl WebhookResponder {
    pub fn new(router: Arc<ResponseChainRouter>, dispatcher: CallbackDispatcher, delay: Duration) -> Self {
        Self {
            router,
            dispatcher,
            delay,
        }
    }

    pub async fn handle(&self, request: SkillRequest) -> Result<CallbackTask, BotError> {
        let utterance = request.user_request.utterance.trim();
        tracing::info!("Skill request: {:?}", utterance);

        let answer = self.router.respond(utterance).await?;

        let Some(url) = request.callback_url().map(str::to_string) else {
            tracing::warn!("Skill request has no callback URL; answer not delivered");
            return Ok(CallbackTask {
                answer,
                handle: None,
            });
        };

        let payload = CallbackPayload::simple_text(answer.clone());
        let dispatcher = self.dispatcher.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = dispatcher.dispatch(&url, &payload).await {
                tracing::error!("Callback to {} failed: {}", url, err);
            }
        });

        Ok(CallbackTask {
            answer,
            handle: Some(handle),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use axum::routing::post;
    use axum::Router;

    use super::*;
    use crate::responder::{CompletionSettings, IntentClassifier, IntentSet, PromptTemplate};
    use crate::test_support::{spawn_server, ScriptedProvider};

    fn responder(provider: Arc<ScriptedProvider>, delay: Duration) -> WebhookResponder {
        let settings = CompletionSettings {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.1,
            max_tokens: 200,
        };
        let classifier = IntentClassifier::new(
            provider.clone(),
            PromptTemplate::parse("intent", "{user_message}").unwrap(),
            IntentSet::parse("bug\ndefault").unwrap(),
            settings.clone(),
        )
        .unwrap();
        let router =
            ResponseChainRouter::new(provider, classifier, BTreeMap::new(), settings.clone(), settings)
                .unwrap();

        WebhookResponder::new(
            Arc::new(router),
            CallbackDispatcher::new(Duration::from_secs(2), false).unwrap(),
            delay,
        )
    }

    fn request(utterance: &str, callback_url: Option<&str>) -> SkillRequest {
        let body = serde_json::json!({
            "userRequest": { "utterance": utterance, "callbackUrl": callback_url }
        });
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn answer_is_posted_to_callback_url() {
        let received = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = received.clone();
        let app = Router::new().route(
            "/cb",
            post(move |body: String| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                }
            }),
        );
        let base = spawn_server(app).await;
        let provider = Arc::new(ScriptedProvider::texts(&["default", "hello"]));

        let task = responder(provider, Duration::from_millis(10))
            .handle(request("hi", Some(&format!("{}/cb", base))))
            .await
            .unwrap();

        assert_eq!(task.answer(), "hello");
        assert!(task.is_scheduled());
        task.wait().await;

        assert_eq!(
            *received.lock().unwrap(),
            vec![r#"{"version":"2.0","template":{"outputs":[{"simpleText":{"text":"hello"}}]}}"#.to_string()]
        );
    }

    #[tokio::test]
    async fn handle_returns_before_the_delay_elapses() {
        let provider = Arc::new(ScriptedProvider::texts(&["default", "later"]));
        let started = std::time::Instant::now();

        let task = responder(provider, Duration::from_secs(30))
            .handle(request("hi", Some("http://127.0.0.1:9/cb")))
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(task.is_scheduled());
    }

    #[tokio::test]
    async fn missing_callback_url_skips_dispatch() {
        let provider = Arc::new(ScriptedProvider::texts(&["bug", "sorry"]));

        let task = responder(provider, Duration::ZERO)
            .handle(request("it broke", None))
            .await
            .unwrap();

        assert_eq!(task.answer(), "sorry");
        assert!(!task.is_scheduled());
    }

    #[tokio::test]
    async fn failed_delivery_is_swallowed() {
        let provider = Arc::new(ScriptedProvider::texts(&["default", "hello"]));

        let task = responder(provider, Duration::ZERO)
            .handle(request("hi", Some("http://127.0.0.1:9/cb")))
            .await
            .unwrap();

        task.wait().await;
    }

    #[tokio::test]
    async fn router_errors_propagate() {
        let provider = Arc::new(ScriptedProvider::default());
        provider.push_failure("bad gateway");

        let err = responder(provider, Duration::ZERO)
            .handle(request("hi", Some("http://127.0.0.1:9/cb")))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::UpstreamFailure(_)));
    }
}
