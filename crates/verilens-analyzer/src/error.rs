//! Error types for the Analyzer

use thiserror::Error;

/// Errors that reject a request before any model call is made
///
/// Failures of the model calls themselves never surface here; they are
/// folded into the response body instead.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// Neither text nor a readable image was supplied
    #[error("No input provided")]
    NoInputProvided,

    /// An image was uploaded but this analyzer has no OCR adapter
    #[error("OCR is not enabled on this server")]
    OcrUnavailable,

    /// Text recognition failed
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    /// Resolved text exceeds the configured maximum
    #[error("Text too long: {0} chars (max: {1})")]
    TextTooLong(usize, usize),
}

/// Errors raised while reading text out of an uploaded image
#[derive(Error, Debug)]
pub enum OcrError {
    /// Upload carried no bytes
    #[error("Uploaded image is empty")]
    EmptyImage,

    /// Could not stage the upload on disk
    #[error("Failed to stage upload: {0}")]
    TempFile(#[from] std::io::Error),

    /// OCR engine could not be started
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    /// OCR engine ran but reported an error
    #[error("Text recognition failed: {0}")]
    Recognition(String),

    /// OCR engine did not finish in time
    #[error("Text recognition timed out after {0}s")]
    Timeout(u64),
}

/// Model output that could not be read as the expected JSON
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{cause}")]
pub struct ParseError {
    /// Model output exactly as received
    pub raw: String,

    /// What went wrong
    pub cause: String,
}

impl ParseError {
    pub(crate) fn new(raw: &str, cause: impl Into<String>) -> Self {
        Self {
            raw: raw.to_string(),
            cause: cause.into(),
        }
    }

    /// Message placed in the response when parsing fails
    ///
    /// Always embeds the raw model output.
    pub fn message(&self) -> String {
        format!("Parse error: {}. Raw response: {}", self.cause, self.raw)
    }
}
