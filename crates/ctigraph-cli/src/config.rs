//! Configuration management for the CLI.
//!
//! Settings come from an optional TOML file with `[output]`, `[extractor]`
//! and `[validation]` tables; command-line flags override them afterwards.

use crate::error::{CliError, Result};
use ctigraph_domain::{ontology, Ontology};
use ctigraph_extractor::ExtractorConfig;
use ctigraph_gatekeeper::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Output settings
    #[serde(default)]
    pub output: Settings,

    /// Extraction pipeline settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Ontology validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Load configuration from `path`, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path).map_err(|e| CliError::input(path, e))?;
        let config = Self::from_toml(&contents).map_err(|e| match e {
            CliError::Toml(e) => CliError::input(path, e),
            other => other,
        })?;
        info!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.extractor
            .validate()
            .map_err(|e| CliError::Config(format!("[extractor] {}", e)))?;
        self.validation
            .validate()
            .map_err(|e| CliError::Config(format!("[validation] {}", e)))?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: default_true(),
            format: default_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

/// Install the process-wide ontology
///
/// Without a file the built-in STIX vocabulary is used.
pub fn load_ontology(path: Option<&Path>) -> Result<&'static Ontology> {
    let Some(path) = path else {
        return Ok(ontology::global());
    };
    let contents = fs::read_to_string(path).map_err(|e| CliError::input(path, e))?;
    let parsed = Ontology::from_toml_str(&contents).map_err(|e| CliError::input(path, e))?;
    let installed = ontology::install(parsed)?;
    info!(
        "Loaded ontology from {} ({} types, {} predicates)",
        path.display(),
        installed.types().len(),
        installed.predicates().len()
    );
    Ok(installed)
}
