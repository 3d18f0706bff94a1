//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between the pipeline and the
//! services it consumes. Implementations live in other crates.

use serde::{Deserialize, Serialize};

/// Sampling options passed to the completion service with every prompt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Sampling temperature
    pub temperature: f64,
    /// Nucleus sampling threshold
    pub top_p: f64,
    /// Repetition penalty
    pub repeat_penalty: f64,
    /// Maximum number of generated tokens
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            repeat_penalty: 1.1,
            max_tokens: 512,
        }
    }
}

impl GenerationOptions {
    /// Same options with a different token budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Text completion service
///
/// Implemented by the infrastructure layer (ctigraph-llm). Responses are
/// free text; callers must not assume valid JSON or determinism.
pub trait CompletionService {
    /// Error type for completion calls
    type Error;

    /// Complete a prompt
    fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String, Self::Error>;

    /// Model identifier, for output artifacts
    fn model_name(&self) -> &str;
}

/// A labelled span reported by a linguistic tagger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSpan {
    /// Span text
    pub text: String,
    /// Label from an open vocabulary (`ORG`, `GPE`, `VERB`, ...)
    pub label: String,
    /// Start byte offset, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// End byte offset, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl TaggedSpan {
    /// Create a span without offsets
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            start: None,
            end: None,
        }
    }

    /// Attach byte offsets
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

/// Label a tagger uses for verb tokens
pub const VERB_LABEL: &str = "VERB";

/// Named-entity tagger
///
/// Implemented by the application layer (ctigraph-extractor ships a
/// rule-based one).
pub trait LinguisticTagger {
    /// Tag a text unit
    fn tag(&self, text: &str) -> Vec<TaggedSpan>;
}

impl<T: LinguisticTagger + ?Sized> LinguisticTagger for &T {
    fn tag(&self, text: &str) -> Vec<TaggedSpan> {
        (**self).tag(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.temperature, 0.1);
        assert_eq!(opts.top_p, 0.9);
        assert_eq!(opts.repeat_penalty, 1.1);
        assert_eq!(opts.max_tokens, 512);
        assert_eq!(opts.with_max_tokens(1024).max_tokens, 1024);
    }

    #[test]
    fn test_partial_options_use_defaults() {
        let opts: GenerationOptions = serde_json::from_str(r#"{"max_tokens": 64}"#).unwrap();
        assert_eq!(opts.max_tokens, 64);
        assert_eq!(opts.top_p, 0.9);
    }

    #[test]
    fn test_verb_label_is_exported_at_crate_root() {
        let span = crate::TaggedSpan::new("deployed", crate::VERB_LABEL);
        assert_eq!(span.label, "VERB");
    }
}
