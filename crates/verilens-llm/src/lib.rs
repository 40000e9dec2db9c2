//! VeriLens LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `verilens-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `GeminiProvider`: Google Gemini `generateContent` API
//!
//! # Examples
//!
//! ```
//! use verilens_llm::MockProvider;
//! use verilens_domain::LlmProvider;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # });
//! ```

#![warn(missing_docs)]

pub mod gemini;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use verilens_domain::LlmProvider;

pub use gemini::GeminiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error, including timeouts
    #[error("Communication error: {0}")]
    Communication(String),

    /// Provider answered with a non-success HTTP status
    #[error("Provider returned HTTP {status}: {body}")]
    Provider {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Provider answered successfully but the envelope had no usable text
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Human-facing description of the failure
    ///
    /// Provider errors yield the raw response body unchanged so callers can
    /// surface exactly what the provider said.
    pub fn detail(&self) -> String {
        match self {
            LlmError::Provider { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// Canned outcome for a mocked prompt
#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(LlmError),
}

/// Mock LLM provider for deterministic testing
///
/// Replies are keyed by a fragment of the prompt: the first registered
/// fragment contained in the prompt wins, otherwise the default response is
/// returned. No network calls are made.
///
/// # Examples
///
/// ```
/// use verilens_llm::MockProvider;
/// use verilens_domain::LlmProvider;
///
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let mut provider = MockProvider::default();
/// provider.add_response("Classify", r#"{"type": "question", "reason": "asks"}"#);
/// provider.add_response("Evaluate", r#"{"score": 10, "explanation": "false"}"#);
///
/// let answer = provider.generate("Classify this post").await.unwrap();
/// assert!(answer.contains("question"));
/// assert_eq!(provider.call_count(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, MockReply)>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply with `response` to any prompt containing `fragment`
    pub fn add_response(&mut self, fragment: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).push((fragment.into(), MockReply::Text(response.into())));
    }

    /// Fail with `error` for any prompt containing `fragment`
    pub fn add_error(&mut self, fragment: impl Into<String>, error: LlmError) {
        lock(&self.responses).push((fragment.into(), MockReply::Fail(error)));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Forget all recorded prompts
    pub fn reset_call_count(&self) {
        lock(&self.prompts).clear();
    }

    fn reply_for(&self, prompt: &str) -> Result<String, LlmError> {
        lock(&self.prompts).push(prompt.to_string());

        let responses = lock(&self.responses);
        match responses.iter().find(|(fragment, _)| prompt.contains(fragment.as_str())) {
            Some((_, MockReply::Text(text))) => Ok(text.clone()),
            Some((_, MockReply::Fail(error))) => Err(error.clone()),
            None => Ok(self.default_response.clone()),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.reply_for(prompt)
    }
}
