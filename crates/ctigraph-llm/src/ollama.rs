//! Ollama Provider Implementation
//!
//! Talks to a local Ollama instance over its HTTP API.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - Sampling options forwarded with every request
//! - Client-level timeout, no transport retries
//! - Model listing via `/api/tags`
//!
//! # Examples
//!
//! ```no_run
//! use ctigraph_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "gemma2:9b").unwrap();
//! // `generate` is async; the `CompletionService` impl blocks on it and is
//! // meant to be called from a blocking thread.
//! ```

use crate::LlmError;
use ctigraph_domain::{CompletionService, GenerationOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for completion requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Ollama API provider
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: RequestOptions,
}

#[derive(Serialize)]
struct RequestOptions {
    temperature: f64,
    top_p: f64,
    repeat_penalty: f64,
    num_predict: u32,
}

impl From<&GenerationOptions> for RequestOptions {
    fn from(opts: &GenerationOptions) -> Self {
        Self {
            temperature: opts.temperature,
            top_p: opts.top_p,
            repeat_penalty: opts.repeat_penalty,
            num_predict: opts.max_tokens,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the default timeout
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ctigraph_llm::OllamaProvider;
    ///
    /// let provider = OllamaProvider::new("http://localhost:11434", "llama3").unwrap();
    /// assert_eq!(provider.model(), "llama3");
    /// ```
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(endpoint, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a provider with an explicit request timeout
    pub fn with_timeout(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Communication(format!("Failed to build HTTP client: {}", e)))?;

        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Ok(Self {
            endpoint,
            model: model.into(),
            client,
            timeout,
        })
    }

    /// Configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Configured model
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a completion
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Ollama is not running or the request times out
    /// - Model is not available
    /// - Response format is invalid
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: options.into(),
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.model.clone()));
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Communication(format!("HTTP {}: {}", status, text)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.response.unwrap_or_default().trim().to_string())
    }

    /// List models installed on the Ollama instance
    pub async fn available_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(LlmError::Communication(format!("HTTP {}", response.status())));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse tags: {}", e)))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Check whether the configured model is installed
    ///
    /// A bare model name also matches its `:latest` tag.
    pub async fn has_model(&self) -> Result<bool, LlmError> {
        let models = self.available_models().await?;
        Ok(model_listed(&models, &self.model))
    }

    fn transport_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout(self.timeout.as_secs())
        } else {
            LlmError::Communication(format!("Request failed: {}", e))
        }
    }
}

fn model_listed(models: &[String], wanted: &str) -> bool {
    models
        .iter()
        .any(|m| m == wanted || (!wanted.contains(':') && *m == format!("{}:latest", wanted)))
}

impl CompletionService for OllamaProvider {
    type Error = LlmError;

    /// Blocking wrapper around [`OllamaProvider::generate`]
    ///
    /// Must not be called from inside an async task; run it on a blocking
    /// thread (`tokio::task::spawn_blocking`) or outside any runtime.
    fn complete(&self, prompt: &str, options: &GenerationOptions) -> Result<String, Self::Error> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(self.generate(prompt, options)),
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e)))?
                .block_on(self.generate(prompt, options)),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
