use std::time::Duration;

use reqwest::Client;

use super::payload::CallbackPayload;
use crate::core::config::WebhookConfig;
use crate::core::errors::BotError;

/// Delivers callback payloads. One POST per payload, never retried; the
/// receiver's reply is only logged.
#[derive(Clone)]
pub struct CallbackDispatcher {
    client: Client,
}

impl CallbackDispatcher {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, BotError> {
        if accept_invalid_certs {
            tracing::warn!("Callback TLS certificates are not verified");
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(BotError::upstream)?;

        Ok(Self { client })
    }

    pub fn from_config(config: &WebhookConfig) -> Result<Self, BotError> {
        Self::new(
            Duration::from_secs(config.timeout_secs),
            config.accept_invalid_certs,
        )
    }

    pub async fn dispatch(&self, url: &str, payload: &CallbackPayload) -> Result<(), BotError> {
        let body = serde_json::to_string(payload).map_err(BotError::upstream)?;
        tracing::debug!("Callback body for {}: {}", url, body);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        tracing::debug!("Callback response from {}: {} {}", url, status, text);
        if status.is_success() {
            tracing::info!("Callback delivered to {}", url);
        } else {
            tracing::warn!("Callback to {} answered {}", url, status);
        }
        Ok(())
    }
}
