//! ctigraph Completion Provider Layer
//!
//! Implementations of the `CompletionService` trait from `ctigraph-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use ctigraph_llm::MockProvider;
//! use ctigraph_domain::{CompletionService, GenerationOptions};
//!
//! let provider = MockProvider::new("[]");
//! let result = provider.complete("test prompt", &GenerationOptions::default()).unwrap();
//! assert_eq!(result, "[]");
//! ```

#![warn(missing_docs)]

pub mod ollama;

use ctigraph_domain::{CompletionService, GenerationOptions};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub use ollama::OllamaProvider;

/// Errors that can occur during completion calls
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// The request exceeded the client timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Invalid response from the service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

const ERROR_SENTINEL: &str = "ERROR";

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, String>,
    containing: Vec<(String, String)>,
    script: VecDeque<String>,
    prompts: Vec<String>,
}

/// Mock completion provider for deterministic testing
///
/// Lookup order for each call: scripted queue, exact prompt, first
/// substring rule, default response. A response of `"ERROR"` is returned
/// as an [`LlmError::Other`].
///
/// # Examples
///
/// ```
/// use ctigraph_llm::MockProvider;
/// use ctigraph_domain::{CompletionService, GenerationOptions};
///
/// let opts = GenerationOptions::default();
/// let provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.add_response_containing("APT28", "[]");
/// assert_eq!(provider.complete("prompt1", &opts).unwrap(), "response1");
/// assert_eq!(provider.complete("text about APT28", &opts).unwrap(), "[]");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model: String,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model: "mock".to_string(),
            delay: None,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Report a different model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&self, prompt: impl Into<String>, response: impl Into<String>) {
        self.state().responses.insert(prompt.into(), response.into());
    }

    /// Answer any prompt containing `needle`; earlier rules win
    pub fn add_response_containing(&self, needle: impl Into<String>, response: impl Into<String>) {
        self.state().containing.push((needle.into(), response.into()));
    }

    /// Queue responses returned in order before any other lookup
    pub fn push_script<I, S>(&self, responses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().script.extend(responses.into_iter().map(Into::into));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&self, prompt: impl Into<String>) {
        self.add_response(prompt, ERROR_SENTINEL);
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> usize {
        self.state().prompts.len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    /// Reset the call history
    pub fn reset_call_count(&self) {
        self.state().prompts.clear();
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl CompletionService for MockProvider {
    type Error = LlmError;

    fn complete(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, Self::Error> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let mut state = self.state();
        state.prompts.push(prompt.to_string());

        let response = state
            .script
            .pop_front()
            .or_else(|| state.responses.get(prompt).cloned())
            .or_else(|| {
                state
                    .containing
                    .iter()
                    .find(|(needle, _)| prompt.contains(needle.as_str()))
                    .map(|(_, r)| r.clone())
            })
            .unwrap_or_else(|| self.default_response.clone());

        if response == ERROR_SENTINEL {
            return Err(LlmError::Other("Mock error".to_string()));
        }
        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> GenerationOptions {
        GenerationOptions::default()
    }

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        assert_eq!(provider.complete("any prompt", &opts()).unwrap(), "Test response");
        assert_eq!(provider.model_name(), "mock");
    }

    #[test]
    fn test_mock_provider_specific_responses() {
        let provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.complete("hello", &opts()).unwrap(), "world");
        assert_eq!(provider.complete("foo", &opts()).unwrap(), "bar");
        assert_eq!(provider.complete("unknown", &opts()).unwrap(), "Default mock response");
    }

    #[test]
    fn test_mock_provider_containing_rules_keep_order() {
        let provider = MockProvider::new("none");
        provider.add_response_containing("Emotet", "first");
        provider.add_response_containing("Emotet drops", "second");
        assert_eq!(provider.complete("Emotet drops TrickBot", &opts()).unwrap(), "first");
    }

    #[test]
    fn test_mock_provider_script_runs_first() {
        let provider = MockProvider::new("fallback");
        provider.add_response("p", "exact");
        provider.push_script(["one", "two"]);
        assert_eq!(provider.complete("p", &opts()).unwrap(), "one");
        assert_eq!(provider.complete("p", &opts()).unwrap(), "two");
        assert_eq!(provider.complete("p", &opts()).unwrap(), "exact");
    }

    #[test]
    fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.complete("prompt1", &opts()).unwrap();
        provider.complete("prompt2", &opts()).unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1", "prompt2"]);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_error() {
        let provider = MockProvider::default();
        provider.add_error("bad prompt");

        let result = provider.complete("bad prompt", &opts());
        assert!(matches!(result.unwrap_err(), LlmError::Other(_)));
    }

    #[test]
    fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.complete("test", &opts()).unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }
}
