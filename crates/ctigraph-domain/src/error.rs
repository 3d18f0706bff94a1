//! Domain error types

use thiserror::Error;

/// Errors raised while loading or installing an ontology
#[derive(Error, Debug)]
pub enum OntologyError {
    /// Failed to parse an ontology TOML document
    #[error("Failed to parse ontology TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The ontology content is inconsistent
    #[error("Invalid ontology: {0}")]
    Invalid(String),

    /// A process-wide ontology was already installed
    #[error("Ontology already installed")]
    AlreadyInstalled,
}
