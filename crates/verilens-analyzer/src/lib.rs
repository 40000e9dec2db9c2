//! VeriLens Analyzer
//!
//! Classifies short social-media posts and fact-checks the ones that make
//! claims, using an LLM for both steps.
//!
//! # Architecture
//!
//! ```text
//! text ─┐
//!       ├─→ resolve input ─→ classify ─→ (claim?) fact-check ─→ response
//! image ┘   (OCR adapter)      LLM             LLM
//! ```
//!
//! # Key Features
//!
//! - **Prompt Builder**: fixed templates asking for strict JSON answers
//! - **Response Extractor**: tolerant JSON extraction from fenced or wordy output
//! - **OCR Adapter**: screenshot uploads via Tesseract, staged in unique temp files
//! - **Absorbed failures**: model errors end up in the response, never as errors
//!
//! # Example Usage
//!
//! ```
//! use verilens_analyzer::{AnalysisRequest, Analyzer, AnalyzerConfig};
//! use verilens_llm::MockProvider;
//!
//! # let rt = tokio::runtime::Runtime::new().unwrap();
//! # rt.block_on(async {
//! let llm = MockProvider::new(r#"{"type": "question", "reason": "asks something"}"#);
//! let analyzer = Analyzer::new(llm, AnalyzerConfig::default());
//!
//! let response = analyzer
//!     .analyze(AnalysisRequest::from_text("Is the Earth flat?"))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(response.category.as_str(), "question");
//! assert!(response.fact_check.is_none());
//! # });
//! ```

#![warn(missing_docs)]

mod analyzer;
mod config;
mod error;
mod ocr;
mod parser;
mod prompt;
mod types;


pub use analyzer::Analyzer;
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, OcrError, ParseError};
pub use ocr::{
    OcrAdapter, TesseractRecognizer, DEFAULT_LANGUAGE, DEFAULT_OCR_TIMEOUT_SECS,
    DEFAULT_TESSERACT_CMD,
};
pub use parser::{extract_json, parse_classification, parse_fact_check};
pub use prompt::{PromptBuilder, TaskKind};
pub use types::{AnalysisRequest, AnalysisResponse, Classification, FactCheck};
