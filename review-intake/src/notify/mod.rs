use anyhow::Result;
use common::NotifierConfig;
use serde::Serialize;

use crate::storage::ReviewRecord;

pub mod relay;

/// Plain-text email handed to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub source: String,
    pub destination: String,
    pub subject: String,
    pub text_body: String,
}

impl EmailMessage {
    /// Notification for a processed review.
    pub fn for_review(source: &str, destination: &str, record: &ReviewRecord) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
            subject: format!("[{}] Review from {}", record.sentiment, record.user_name),
            text_body: format!(
                "User: {}\nSentiment: {}\nScore: {:.2}\n\nReview:\n{}",
                record.user_name, record.sentiment, record.polarity_score, record.review_text
            ),
        }
    }
}

/// Outbound email seam
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<()>;
}

/// Where review notifications go. Both addresses are non-empty by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients {
    sender: String,
    recipient: String,
}

impl Recipients {
    /// `None` unless the notifier section names both a sender and a recipient.
    pub fn from_config(config: &NotifierConfig) -> Option<Self> {
        let (sender, recipient) = config.addresses()?;
        Some(Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
        })
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }
}
