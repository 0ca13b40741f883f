use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

use super::{EmailMessage, Notifier};

/// Notifier posting messages to an HTTP email relay.
///
/// Request body: `{"from": .., "to": [..], "subject": .., "text": ..}`.
pub struct HttpRelayNotifier {
    api_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpRelayNotifier {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: None,
            timeout: Duration::from_secs(10),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[async_trait::async_trait]
impl Notifier for HttpRelayNotifier {
    async fn send_email(&self, message: &EmailMessage) -> Result<()> {
        let body = RelayRequest {
            from: &message.source,
            to: [message.destination.as_str()],
            subject: &message.subject,
            text: &message.text_body,
        };

        let mut request = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .context("Email relay request timed out")?
            .context("Email relay HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Email relay error {}: {}", status, body);
        }

        info!(to = %message.destination, subject = %message.subject, "notification email sent");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}
