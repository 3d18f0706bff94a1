//! Configuration for the Extractor

use ctigraph_domain::GenerationOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Extractor
///
/// Resolved once at start-up and immutable for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Minimum characters for a segment to be considered
    pub min_segment_chars: usize,

    /// Require the tagger to report a verb in the segment
    pub require_verb: bool,

    /// Maximum time for a single completion call (seconds)
    pub extraction_timeout_secs: u64,

    /// Largest text (characters) sent as one single-shot prompt
    pub max_document_chars: usize,

    /// Window size (characters)
    pub window_chars: usize,

    /// Distance between window starts; must be below `window_chars`
    pub window_stride: usize,

    /// Triples kept per paragraph by the selector
    pub per_unit_max: usize,

    /// Cap on the paragraph snippet attached by the selector
    pub context_max_chars: usize,

    /// Cap on entity name length after canonicalization
    pub max_name_chars: usize,

    /// Completion calls in flight at once
    pub concurrency: usize,

    /// Run the support-check pass on extracted triples
    pub validate_support: bool,

    /// Sampling options for sentence and paragraph prompts
    pub generation: GenerationOptions,

    /// Sampling options for whole-document and window prompts
    pub document_generation: GenerationOptions,
}

impl ExtractorConfig {
    /// Get the extraction timeout as a Duration
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    /// Overlap between consecutive windows (characters)
    pub fn window_overlap(&self) -> usize {
        self.window_chars.saturating_sub(self.window_stride)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.extraction_timeout_secs == 0 {
            return Err("extraction_timeout_secs must be greater than 0".to_string());
        }
        if self.max_document_chars == 0 {
            return Err("max_document_chars must be greater than 0".to_string());
        }
        if self.window_chars == 0 {
            return Err("window_chars must be greater than 0".to_string());
        }
        if self.window_stride == 0 || self.window_stride >= self.window_chars {
            return Err("window_stride must be between 1 and window_chars - 1".to_string());
        }
        if self.per_unit_max == 0 {
            return Err("per_unit_max must be greater than 0".to_string());
        }
        if self.max_name_chars == 0 {
            return Err("max_name_chars must be greater than 0".to_string());
        }
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            min_segment_chars: 20,
            require_verb: false,
            extraction_timeout_secs: 120,
            max_document_chars: 12_000,
            window_chars: 6_000,
            window_stride: 4_500,
            per_unit_max: 3,
            context_max_chars: 800,
            max_name_chars: 200,
            concurrency: 1,
            validate_support: false,
            generation: GenerationOptions::default(),
            document_generation: GenerationOptions::default().with_max_tokens(1024),
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: shorter timeouts, smaller windows, parallel calls
    pub fn aggressive() -> Self {
        Self {
            extraction_timeout_secs: 60,
            max_document_chars: 8_000,
            window_chars: 4_000,
            window_stride: 3_000,
            concurrency: 4,
            ..Self::default()
        }
    }

    /// Lenient preset: longer timeouts, larger windows, support checks on
    pub fn lenient() -> Self {
        Self {
            extraction_timeout_secs: 300,
            max_document_chars: 24_000,
            window_chars: 12_000,
            window_stride: 9_000,
            validate_support: true,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
