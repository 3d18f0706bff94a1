//! Error types for the CLI application.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// An input artifact is missing, unreadable or corrupt
    #[error("Cannot read {}: {source}", path.display())]
    Input {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O or parse error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ontology file error
    #[error("Ontology error: {0}")]
    Ontology(#[from] ctigraph_domain::OntologyError),

    /// Extractor error
    #[error("Extractor error: {0}")]
    Extractor(#[from] ctigraph_extractor::ExtractorError),

    /// Completion service error
    #[error("LLM error: {0}")]
    Llm(#[from] ctigraph_llm::LlmError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CliError {
    /// Wrap an error raised while reading `path`
    pub fn input<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        CliError::Input {
            path: path.into(),
            source: source.into(),
        }
    }
}
