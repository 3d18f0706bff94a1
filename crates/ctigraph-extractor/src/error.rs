//! Error types for the Extractor

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Completion service error (transport, HTTP, model)
    #[error("LLM error: {0}")]
    Llm(String),

    /// A completion call exceeded its deadline
    #[error("Extraction timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// A unit had no prompt to send
    #[error("Empty prompt")]
    EmptyPrompt,

    /// The response could not be parsed, even after the repair retry
    #[error("Unparseable response: {0}")]
    Unparseable(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Validation error from the Gatekeeper
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::JsonParse(e.to_string())
    }
}

impl From<ctigraph_gatekeeper::GatekeeperError> for ExtractorError {
    fn from(e: ctigraph_gatekeeper::GatekeeperError) -> Self {
        ExtractorError::Validation(e.to_string())
    }
}
