//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use std::future::Future;
use std::path::Path;

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (verilens-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate a text completion for `prompt`
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Trait for reading text out of an image file
///
/// Implemented by the application layer (verilens-analyzer)
pub trait TextRecognizer {
    /// Error type for recognition
    type Error;

    /// Recognise the text in the image stored at `image_path`
    fn recognize(
        &self,
        image_path: &Path,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
