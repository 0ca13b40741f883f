use anyhow::anyhow;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::error::IntakeError;
use crate::notify::{EmailMessage, Notifier, Recipients};
use crate::sentiment::{Sentiment, SentimentScorer};
use crate::storage::{RecordStore, ReviewRecord};

/// User name recorded when the submission carries none.
pub const DEFAULT_USER_NAME: &str = "Anonymous";
/// `message` field of every successful response.
pub const SUCCESS_MESSAGE: &str = "Review processed";
/// The only thing a caller learns about a failed invocation.
pub const FAILURE_MESSAGE: &str = "Internal Server Error";

/// Normalized review input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSubmission {
    pub user_name: String,
    pub review_text: String,
}

impl ReviewSubmission {
    /// Normalize an invocation event.
    ///
    /// Gateway-style events carry the review as a JSON-encoded string under `body`;
    /// direct invocations pass the review mapping itself.
    pub fn from_event(event: &Value) -> Result<Self, IntakeError> {
        match event {
            Value::Object(map) => match map.get("body") {
                Some(Value::String(encoded)) => Self::from_encoded(encoded),
                _ => Self::from_mapping(map),
            },
            Value::String(encoded) => Self::from_encoded(encoded),
            other => Err(IntakeError::MalformedInput(format!(
                "expected an object event, got {}",
                json_kind(other)
            ))),
        }
    }

    /// Normalize a raw HTTP body: a review object, or a JSON string encoding one.
    pub fn from_body(body: &str) -> Result<Self, IntakeError> {
        match serde_json::from_str::<Value>(body)? {
            Value::Object(map) => Self::from_mapping(&map),
            Value::String(encoded) => Self::from_encoded(&encoded),
            other => Err(IntakeError::MalformedInput(format!(
                "expected a review object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn from_encoded(encoded: &str) -> Result<Self, IntakeError> {
        match serde_json::from_str::<Value>(encoded)? {
            Value::Object(map) => Self::from_mapping(&map),
            other => Err(IntakeError::MalformedInput(format!(
                "body must encode an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn from_mapping(map: &Map<String, Value>) -> Result<Self, IntakeError> {
        let user_name = optional_string(map, "user_name")?
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
        let review_text = optional_string(map, "review")?.unwrap_or_default();
        Ok(Self {
            user_name,
            review_text,
        })
    }
}

fn optional_string(map: &Map<String, Value>, key: &str) -> Result<Option<String>, IntakeError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(IntakeError::MalformedInput(format!(
            "field `{}` must be a string, got {}",
            key,
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Success payload returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub message: String,
    pub user_name: String,
    pub sentiment: Sentiment,
    /// Polarity rounded to two decimals
    pub polarity_score: f64,
}

/// Gateway proxy-style response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// JSON text
    pub body: String,
}

impl InvocationResponse {
    pub fn ok(body: String) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code: 200,
            headers,
            body,
        }
    }

    pub fn failure() -> Self {
        Self {
            status_code: 500,
            headers: BTreeMap::new(),
            body: Value::from(FAILURE_MESSAGE).to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// The review intake handler: score, persist, maybe notify, respond.
///
/// Collaborators are injected once at startup and shared read-only by all invocations.
pub struct ReviewIntake {
    scorer: Arc<dyn SentimentScorer>,
    store: Arc<dyn RecordStore>,
    notifier: Option<Arc<dyn Notifier>>,
    recipients: Option<Recipients>,
}

impl ReviewIntake {
    pub fn new(scorer: Arc<dyn SentimentScorer>, store: Arc<dyn RecordStore>) -> Self {
        Self {
            scorer,
            store,
            notifier: None,
            recipients: None,
        }
    }

    /// Enable positive-review emails. Without `recipients` no email is ever sent.
    pub fn with_notifier(
        mut self,
        notifier: Arc<dyn Notifier>,
        recipients: Option<Recipients>,
    ) -> Self {
        self.notifier = Some(notifier);
        self.recipients = recipients;
        self
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifier.is_some() && self.recipients.is_some()
    }

    /// Run the pipeline for an invocation event.
    pub async fn process_event(&self, event: &Value) -> Result<ReviewOutcome, IntakeError> {
        let submission = ReviewSubmission::from_event(event)?;
        self.process(submission).await
    }

    /// Run the pipeline for an already-normalized submission.
    pub async fn process(&self, submission: ReviewSubmission) -> Result<ReviewOutcome, IntakeError> {
        let timestamp = Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();

        let raw = self
            .scorer
            .score(&submission.review_text)
            .await
            .map_err(IntakeError::UnclassifiedFailure)?;
        if !raw.is_finite() {
            return Err(IntakeError::UnclassifiedFailure(anyhow!(
                "scorer returned non-finite polarity {}",
                raw
            )));
        }
        let polarity = raw.clamp(-1.0, 1.0);
        let sentiment = Sentiment::from_polarity(polarity);

        let record = ReviewRecord {
            user_name: submission.user_name,
            review_text: submission.review_text,
            sentiment,
            polarity_score: polarity,
            timestamp,
        };

        self.store
            .put_review(&record)
            .await
            .map_err(IntakeError::StoreFailure)?;

        if sentiment == Sentiment::Positive {
            match (&self.notifier, &self.recipients) {
                (Some(notifier), Some(recipients)) => {
                    let email =
                        EmailMessage::for_review(recipients.sender(), recipients.recipient(), &record);
                    notifier
                        .send_email(&email)
                        .await
                        .map_err(IntakeError::NotifyFailure)?;
                }
                _ => debug!("positive review but notifications are not configured"),
            }
        }

        Ok(ReviewOutcome {
            message: SUCCESS_MESSAGE.to_string(),
            user_name: record.user_name,
            sentiment,
            polarity_score: round2(polarity),
        })
    }

    /// Error boundary for gateway-style / direct invocations.
    pub async fn handle_event(&self, event: &Value) -> InvocationResponse {
        let span = info_span!("invocation", request_id = %Uuid::new_v4());
        async { respond(self.process_event(event).await) }
            .instrument(span)
            .await
    }

    /// Error boundary for an event that has not been decoded yet (`/invoke`, `invoke --event`).
    pub async fn handle_raw_event(&self, raw: &str) -> InvocationResponse {
        let span = info_span!("invocation", request_id = %Uuid::new_v4());
        async {
            let result = match serde_json::from_str::<Value>(raw) {
                Ok(event) => self.process_event(&event).await,
                Err(e) => Err(IntakeError::from(e)),
            };
            respond(result)
        }
        .instrument(span)
        .await
    }

    /// Error boundary for a raw HTTP body.
    pub async fn handle_body(&self, body: &str) -> InvocationResponse {
        let span = info_span!("invocation", request_id = %Uuid::new_v4());
        async {
            let result = match ReviewSubmission::from_body(body) {
                Ok(submission) => self.process(submission).await,
                Err(e) => Err(e),
            };
            respond(result)
        }
        .instrument(span)
        .await
    }
}

fn respond(result: Result<ReviewOutcome, IntakeError>) -> InvocationResponse {
    match result {
        Ok(outcome) => match serde_json::to_string(&outcome) {
            Ok(body) => {
                info!(
                    user_name = %outcome.user_name,
                    sentiment = %outcome.sentiment,
                    polarity = outcome.polarity_score,
                    "review processed"
                );
                InvocationResponse::ok(body)
            }
            Err(e) => {
                error!(error = %e, "failed to serialize review outcome");
                InvocationResponse::failure()
            }
        },
        Err(e) => {
            error!(kind = e.kind(), error = %e, detail = ?e, "review processing failed");
            InvocationResponse::failure()
        }
    }
}

/// Round to two decimals on the exact binary value, ties to even (`0.125` -> `0.12`).
///
/// Goes through `{:.2}` so the response agrees with the score printed in emails.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}
