//! Core Analyzer implementation

use crate::config::AnalyzerConfig;
use crate::error::{AnalyzerError, OcrError};
use crate::ocr::{OcrAdapter, TesseractRecognizer};
use crate::parser::{parse_classification, parse_fact_check};
use crate::prompt::{PromptBuilder, TaskKind};
use crate::types::{AnalysisRequest, AnalysisResponse, Classification, FactCheck};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use verilens_domain::{Category, LlmProvider, TextRecognizer};
use verilens_llm::LlmError;

/// The Analyzer classifies posts and fact-checks the claims among them
///
/// One instance serves every request; it holds no per-request state.
pub struct Analyzer<L, R = TesseractRecognizer> {
    llm_provider: L,
    ocr: Option<OcrAdapter<R>>,
    config: AnalyzerConfig,
}

impl<L> Analyzer<L>
where
    L: LlmProvider<Error = LlmError> + Send + Sync,
{
    /// Create a text-only Analyzer
    pub fn new(llm_provider: L, config: AnalyzerConfig) -> Self {
        Self {
            llm_provider,
            ocr: None,
            config,
        }
    }
}

impl<L, R> Analyzer<L, R>
where
    L: LlmProvider<Error = LlmError> + Send + Sync,
    R: TextRecognizer<Error = OcrError> + Send + Sync,
{
    /// Accept image uploads, reading them with `ocr`
    pub fn with_ocr<R2>(self, ocr: OcrAdapter<R2>) -> Analyzer<L, R2> {
        Analyzer {
            llm_provider: self.llm_provider,
            ocr: Some(ocr),
            config: self.config,
        }
    }

    /// Whether image uploads can be read
    pub fn ocr_enabled(&self) -> bool {
        self.ocr.is_some()
    }

    /// Active configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyse one post
    ///
    /// Only input problems are errors. Model failures are reported inside
    /// the returned response.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, AnalyzerError> {
        let text = self.resolve_input(request).await?;
        info!(chars = text.chars().count(), "Analyzing post");

        let classification = self.classify(&text).await;
        info!(category = %classification.category, "Post classified");

        let fact_check = if classification.category.is_claim() {
            let fact_check = self.fact_check(&text).await;
            info!(score = ?fact_check.score, "Claim fact-checked");
            Some(fact_check)
        } else {
            None
        };

        Ok(AnalysisResponse::merge(classification, fact_check))
    }

    /// Turn the request into the text to analyse
    pub async fn resolve_input(&self, request: AnalysisRequest) -> Result<String, AnalyzerError> {
        let AnalysisRequest { text, image } = request;

        let text = match text.filter(|t| !t.trim().is_empty()) {
            Some(text) => text,
            None => {
                let image = image.ok_or(AnalyzerError::NoInputProvided)?;
                self.extract_text(&image).await?
            }
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(AnalyzerError::NoInputProvided);
        }

        let len = text.chars().count();
        if len > self.config.max_text_length {
            return Err(AnalyzerError::TextTooLong(len, self.config.max_text_length));
        }

        Ok(text.to_string())
    }

    /// Read the text in an image without analysing it
    pub async fn extract_text(&self, image: &[u8]) -> Result<String, AnalyzerError> {
        let ocr = self.ocr.as_ref().ok_or(AnalyzerError::OcrUnavailable)?;
        Ok(ocr.extract_text(image).await?)
    }

    /// Classify `text`
    pub async fn classify(&self, text: &str) -> Classification {
        let prompt = PromptBuilder::new(text).build(TaskKind::Classify);

        match self.call_llm(&prompt).await {
            Ok(raw) => parse_classification(&raw).unwrap_or_else(|e| {
                warn!("Classification answer was not valid JSON: {}", e);
                Classification {
                    category: Category::Unknown,
                    reason: e.message(),
                }
            }),
            Err(e) => {
                warn!("Classification call failed: {}", e);
                Classification {
                    category: Category::Error,
                    reason: e.detail(),
                }
            }
        }
    }

    /// Score the truthfulness of `text`
    pub async fn fact_check(&self, text: &str) -> FactCheck {
        let prompt = PromptBuilder::new(text).build(TaskKind::FactCheck);

        match self.call_llm(&prompt).await {
            Ok(raw) => parse_fact_check(&raw).unwrap_or_else(|e| {
                warn!("Fact-check answer was not valid JSON: {}", e);
                FactCheck {
                    score: None,
                    explanation: e.message(),
                }
            }),
            Err(e) => {
                warn!("Fact-check call failed: {}", e);
                FactCheck {
                    score: None,
                    explanation: e.detail(),
                }
            }
        }
    }

    async fn call_llm(&self, prompt: &str) -> Result<String, LlmError> {
        debug!("Prompt length: {} chars", prompt.len());

        let limit = self.config.model_call_timeout();
        let raw = timeout(limit, self.llm_provider.generate(prompt))
            .await
            .map_err(|_| {
                LlmError::Communication(format!("Model call timed out after {}s", limit.as_secs()))
            })??;

        debug!("LLM response length: {} chars", raw.len());
        Ok(raw)
    }
}
