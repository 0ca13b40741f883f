use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Polarity above this is Positive.
pub const POSITIVE_THRESHOLD: f64 = 0.1;
/// Polarity below this is Negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Sentiment label derived from a polarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Classify a polarity. Both thresholds are exclusive: exactly 0.1 and -0.1 are Neutral.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if polarity < NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core trait for sentiment scorers (embedded or remote)
#[async_trait::async_trait]
pub trait SentimentScorer: Send + Sync {
    /// Polarity of `text` in [-1.0, 1.0]; negative is unfavourable.
    async fn score(&self, text: &str) -> Result<f64>;

    /// Short name used in startup logs
    fn name(&self) -> &'static str;
}

pub mod lexicon;
pub mod remote;
