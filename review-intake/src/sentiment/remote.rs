use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::SentimentScorer;

/// Scorer backed by an HTTP polarity service.
///
/// The service receives `{"text": "..."}` and answers `{"polarity": <f64>}`.
pub struct RemoteScorer {
    api_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteScorer {
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
impl SentimentScorer for RemoteScorer {
    async fn score(&self, text: &str) -> Result<f64> {
        let mut request = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&ScoreRequest { text });
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .context("Scorer request timed out")?
            .context("Scorer HTTP request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Scorer API error {}: {}", status, body);
        }

        let body: ScoreResponse = response
            .json()
            .await
            .context("Failed to parse scorer response")?;

        Ok(body.polarity.clamp(-1.0, 1.0))
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    polarity: f64,
}
