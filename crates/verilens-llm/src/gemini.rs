//! Gemini Provider Implementation
//!
//! Provides integration with Google's Gemini `generateContent` API.
//!
//! # Features
//!
//! - Async HTTP communication with the Gemini REST API
//! - Configurable base URL, model and timeout
//! - API key taken from the environment, never embedded
//! - Single attempt per call; failures are reported, not retried
//!
//! # Examples
//!
//! ```no_run
//! use std::time::Duration;
//! use verilens_llm::gemini::{GeminiProvider, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL};
//!
//! let api_key = std::env::var(DEFAULT_API_KEY_ENV).unwrap();
//! let provider =
//!     GeminiProvider::new(DEFAULT_BASE_URL, "gemini-2.5-pro", api_key, Duration::from_secs(60)).unwrap();
//! assert_eq!(provider.model(), "gemini-2.5-pro");
//! ```

use crate::LlmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use verilens_domain::LlmProvider;

/// Default Gemini API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Default timeout for generation requests (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Gemini API provider
///
/// Holds one pooled `reqwest::Client`; cloning the provider shares it.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

/// Request body for the generateContent API
#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Response envelope from the generateContent API
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl<'a> GenerateContentRequest<'a> {
    fn single_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

impl GenerateContentResponse {
    /// Text of the first candidate's first text part
    fn into_text(self) -> Result<String, LlmError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("response contained no candidates".to_string()))?;

        let content = candidate
            .content
            .ok_or_else(|| LlmError::MalformedResponse("first candidate has no content".to_string()))?;

        content
            .parts
            .into_iter()
            .find_map(|part| part.text)
            .ok_or_else(|| LlmError::MalformedResponse("first candidate has no text part".to_string()))
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Parameters
    ///
    /// - `base_url`: API root (e.g., "https://generativelanguage.googleapis.com/v1beta")
    /// - `model`: Model to use (e.g., "gemini-2.5-pro")
    /// - `api_key`: Provider credential
    /// - `timeout`: Upper bound for a whole request
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Other` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// generateContent URL for the configured model, without the key
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Generate text using the Gemini API
    ///
    /// # Errors
    ///
    /// - `Communication` if the request cannot be sent or times out
    /// - `Provider` on a non-success status, carrying the raw body
    /// - `MalformedResponse` if the envelope has no candidate text
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = self.endpoint();
        let request_body = GenerateContentRequest::single_prompt(prompt);

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Communication(format!("Request timed out: {}", e.without_url()))
                } else {
                    LlmError::Communication(format!("Request failed: {}", e.without_url()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let envelope = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| LlmError::MalformedResponse(format!("Failed to decode response: {}", e.without_url())))?;

        let text = envelope.into_text()?;
        debug!(response_len = text.len(), "Received generateContent response");
        Ok(text)
    }
}

impl fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl LlmProvider for GeminiProvider {
    type Error = LlmError;

    async fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        GeminiProvider::generate(self, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            "https://example.test/v1beta/",
            "gemini-2.5-pro",
            "secret-key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_gemini_provider_creation() {
        let provider = provider();
        assert_eq!(provider.base_url, "https://example.test/v1beta");
        assert_eq!(provider.model(), "gemini-2.5-pro");
    }

    #[test]
    fn test_endpoint_excludes_key() {
        let provider = provider();
        assert_eq!(
            provider.endpoint(),
            "https://example.test/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert!(!provider.endpoint().contains("secret-key"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let rendered = format!("{:?}", provider());
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateContentRequest::single_prompt("Is water wet?")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"parts": [{"text": "Is water wet?"}]}]})
        );
    }

    fn decode(raw: &str) -> Result<String, LlmError> {
        serde_json::from_str::<GenerateContentResponse>(raw)
            .unwrap()
            .into_text()
    }

    #[test]
    fn test_envelope_first_candidate_text() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "first"}, {"text": "second"}], "role": "model"}},
                {"content": {"parts": [{"text": "other candidate"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 12}
        }"#;
        assert_eq!(decode(raw).unwrap(), "first");
    }

    #[test]
    fn test_envelope_skips_parts_without_text() {
        let raw = r#"{"candidates": [{"content": {"parts": [{"inlineData": {}}, {"text": "answer"}]}}]}"#;
        assert_eq!(decode(raw).unwrap(), "answer");
    }

    #[test]
    fn test_envelope_empty_candidates_is_malformed() {
        assert!(matches!(decode(r#"{"candidates": []}"#), Err(LlmError::MalformedResponse(_))));
        assert!(matches!(decode(r#"{}"#), Err(LlmError::MalformedResponse(_))));
    }

    #[test]
    fn test_envelope_missing_content_is_malformed() {
        let raw = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        assert!(matches!(decode(raw), Err(LlmError::MalformedResponse(_))));

        let raw = r#"{"candidates": [{"content": {"parts": []}}]}"#;
        assert!(matches!(decode(raw), Err(LlmError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_gemini_error_handling() {
        // Nothing listens on port 9; the request must fail without a panic
        let provider = GeminiProvider::new(
            "http://127.0.0.1:9",
            "gemini-2.5-pro",
            "secret-key",
            Duration::from_secs(2),
        )
        .unwrap();

        let err = provider.generate("test").await.unwrap_err();
        match err {
            LlmError::Communication(msg) => assert!(!msg.contains("secret-key")),
            other => panic!("Expected Communication error, got {:?}", other),
        }
    }
}
