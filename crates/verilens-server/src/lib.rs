//! VeriLens Server
//!
//! HTTP front end for the analyzer: an analyze endpoint and an OCR-only
//! extract-text endpoint, both accepting JSON or multipart uploads, plus a
//! health check.

#![warn(missing_docs)]

pub mod config;
pub mod fetch;
pub mod handlers;

use config::ServerConfig;
use fetch::{FetchError, ImageFetcher};
use handlers::{create_router, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};
use verilens_analyzer::{Analyzer, OcrAdapter, TesseractRecognizer};
use verilens_llm::{GeminiProvider, LlmError};

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Model provider could not be set up
    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),

    /// Image downloader could not be set up
    #[error("Image fetcher error: {0}")]
    Fetch(#[from] FetchError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the production analyzer described by `config`
///
/// Fails if the provider API key is missing from the environment.
pub fn build_analyzer(
    config: &ServerConfig,
) -> Result<Analyzer<GeminiProvider, TesseractRecognizer>, ServerError> {
    let provider = GeminiProvider::new(
        &config.provider.base_url,
        &config.provider.model,
        config.provider.api_key()?,
        config.provider.timeout(),
    )?;

    let analyzer = Analyzer::new(provider, config.analyzer.clone());
    if !config.ocr.enabled {
        return Ok(analyzer);
    }

    let recognizer = TesseractRecognizer::new(&config.ocr.command)
        .with_language(&config.ocr.language)
        .with_timeout(config.ocr.timeout());
    Ok(analyzer.with_ocr(OcrAdapter::new(recognizer)))
}

/// Start the HTTP server
///
/// Builds the analyzer from configuration and serves until the process is
/// stopped.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;

    info!("Starting VeriLens server");
    info!("Bind address: {}", config.bind_addr());
    info!("Model: {} at {}", config.provider.model, config.provider.base_url);
    info!("OCR enabled: {}", config.ocr.enabled);
    warn!("CORS is permissive: any origin may call this server");

    let analyzer = build_analyzer(&config)?;
    let fetcher = ImageFetcher::new(config.image_fetch_timeout(), config.max_upload_bytes)?;
    let state = AppState::new(analyzer, config.provider.model.clone(), config.max_upload_bytes)
        .with_image_fetcher(fetcher);
    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
