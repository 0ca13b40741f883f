//! Error types for the review intake pipeline

use thiserror::Error;

/// Why an invocation failed. Callers only ever see the opaque failure
/// response; the variant and its detail are for operator logs.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// Request body is not parseable as the expected structure
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The record store write did not succeed
    #[error("store failure: {0:#}")]
    StoreFailure(#[source] anyhow::Error),

    /// The notification email could not be sent
    #[error("notify failure: {0:#}")]
    NotifyFailure(#[source] anyhow::Error),

    /// Anything else, e.g. the scorer failing on unexpected input
    #[error("unclassified failure: {0:#}")]
    UnclassifiedFailure(#[source] anyhow::Error),
}

impl From<serde_json::Error> for IntakeError {
    fn from(e: serde_json::Error) -> Self {
        IntakeError::MalformedInput(e.to_string())
    }
}

impl IntakeError {
    /// Stable short name for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            IntakeError::MalformedInput(_) => "MalformedInput",
            IntakeError::StoreFailure(_) => "StoreFailure",
            IntakeError::NotifyFailure(_) => "NotifyFailure",
            IntakeError::UnclassifiedFailure(_) => "UnclassifiedFailure",
        }
    }
}
