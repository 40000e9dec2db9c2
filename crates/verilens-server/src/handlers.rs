//! HTTP request handlers for the analysis service.
//!
//! Implements the analyze, extract-text and health check endpoints using
//! axum. Analyze and extract-text accept either a JSON body or a multipart
//! form; an image may arrive as an upload or as a URL for the server to
//! download. Both endpoints feed the same Analyzer.

use crate::fetch::{FetchError, ImageFetcher};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;
use verilens_analyzer::{AnalysisRequest, AnalysisResponse, Analyzer, AnalyzerError, OcrError};
use verilens_domain::{LlmProvider, TextRecognizer};
use verilens_llm::LlmError;

/// Shared application state
pub struct AppState<L, R> {
    /// Analyzer shared by all requests
    pub analyzer: Arc<Analyzer<L, R>>,
    /// Model identifier reported by the health check
    pub model: String,
    /// Largest accepted request body (bytes)
    pub max_upload_bytes: usize,
    /// Downloads `image_url` submissions; `None` refuses them
    pub image_fetcher: Option<ImageFetcher>,
}

impl<L, R> AppState<L, R> {
    /// Wrap an analyzer for serving
    pub fn new(analyzer: Analyzer<L, R>, model: impl Into<String>, max_upload_bytes: usize) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            model: model.into(),
            max_upload_bytes,
            image_fetcher: None,
        }
    }

    /// Accept `image_url` submissions, downloading them with `fetcher`
    pub fn with_image_fetcher(mut self, fetcher: ImageFetcher) -> Self {
        self.image_fetcher = Some(fetcher);
        self
    }
}

impl<L, R> Clone for AppState<L, R> {
    fn clone(&self) -> Self {
        Self {
            analyzer: Arc::clone(&self.analyzer),
            model: self.model.clone(),
            max_upload_bytes: self.max_upload_bytes,
            image_fetcher: self.image_fetcher.clone(),
        }
    }
}

/// JSON request body
///
/// `text` is the plain API field; `statement` is what the web form sends.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeBody {
    /// Post text
    #[serde(default)]
    pub text: Option<String>,
    /// Alias for `text`
    #[serde(default)]
    pub statement: Option<String>,
    /// Address of an image to download and read
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Model used for analysis
    pub model: String,
    /// Whether image uploads are accepted
    pub ocr_enabled: bool,
}

/// Extract-text response
#[derive(Debug, Serialize, Deserialize)]
pub struct ExtractTextResponse {
    /// Recognised text, trimmed
    pub text: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum ApiError {
    /// Request is well-formed but unusable
    BadRequest(String),
    /// Request body was refused while reading (size limit, broken form)
    Rejected(StatusCode, String),
    /// Image named by `image_url` could not be downloaded
    ImageFetch(FetchError),
    /// Analyzer rejected the input
    Analyzer(AnalyzerError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Rejected(status, msg) => (status, msg),
            ApiError::ImageFetch(e @ FetchError::TooLarge(_)) => {
                (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            ApiError::ImageFetch(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Analyzer(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<AnalyzerError> for ApiError {
    fn from(e: AnalyzerError) -> Self {
        ApiError::Analyzer(e)
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        ApiError::ImageFetch(e)
    }
}

/// Decoded request body, before any image download
#[derive(Debug, Default)]
struct Submission {
    text: Option<String>,
    image: Option<Vec<u8>>,
    image_url: Option<String>,
}

impl From<AnalyzeBody> for Submission {
    fn from(body: AnalyzeBody) -> Self {
        let text = body
            .text
            .filter(|t| !t.trim().is_empty())
            .or(body.statement);
        Submission {
            text,
            image: None,
            image_url: body.image_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

impl Submission {
    fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    /// Build the analysis input, downloading `image_url` only when neither
    /// text nor an uploaded image was sent
    async fn into_request(self, fetcher: Option<&ImageFetcher>) -> Result<AnalysisRequest, ApiError> {
        if self.has_text() || self.image.is_some() {
            return Ok(AnalysisRequest {
                text: self.text,
                image: self.image,
            });
        }

        let image = match self.image_url {
            Some(url) => Some(download(fetcher, &url).await?),
            None => None,
        };
        Ok(AnalysisRequest {
            text: self.text,
            image,
        })
    }

    /// Image bytes for an OCR-only request; an upload wins over a URL
    async fn into_image(self, fetcher: Option<&ImageFetcher>) -> Result<Vec<u8>, ApiError> {
        match (self.image, self.image_url) {
            (Some(image), _) => Ok(image),
            (None, Some(url)) => download(fetcher, &url).await,
            (None, None) => Err(ApiError::BadRequest("No image provided".to_string())),
        }
    }
}

async fn download(fetcher: Option<&ImageFetcher>, url: &str) -> Result<Vec<u8>, ApiError> {
    let fetcher = fetcher
        .ok_or_else(|| ApiError::BadRequest("Image URLs are not accepted by this server".to_string()))?;
    Ok(fetcher.fetch(url).await?)
}

/// POST /analyze - Classify a post and fact-check it if it is a claim
async fn analyze<L, R>(
    State(state): State<AppState<L, R>>,
    request: Request,
) -> Result<Json<AnalysisResponse>, ApiError>
where
    L: LlmProvider<Error = LlmError> + Send + Sync + 'static,
    R: TextRecognizer<Error = OcrError> + Send + Sync + 'static,
{
    let request_id = Uuid::now_v7();
    let span = info_span!("analyze", %request_id);

    async move {
        let submission = read_input(request).await?;
        info!(
            has_text = submission.has_text(),
            has_image = submission.image.is_some(),
            has_image_url = submission.image_url.is_some(),
            "Received analysis request"
        );

        let input = submission.into_request(state.image_fetcher.as_ref()).await?;
        match state.analyzer.analyze(input).await {
            Ok(response) => Ok(Json(response)),
            Err(e) => {
                warn!("Rejected analysis request: {}", e);
                Err(e.into())
            }
        }
    }
    .instrument(span)
    .await
}

/// POST /extract_text - Read the text in an image without analysing it
async fn extract_text<L, R>(
    State(state): State<AppState<L, R>>,
    request: Request,
) -> Result<Json<ExtractTextResponse>, ApiError>
where
    L: LlmProvider<Error = LlmError> + Send + Sync + 'static,
    R: TextRecognizer<Error = OcrError> + Send + Sync + 'static,
{
    let request_id = Uuid::now_v7();
    let span = info_span!("extract_text", %request_id);

    async move {
        if !state.analyzer.ocr_enabled() {
            return Err(AnalyzerError::OcrUnavailable.into());
        }

        let submission = read_input(request).await?;
        let image = submission.into_image(state.image_fetcher.as_ref()).await?;
        info!(bytes = image.len(), "Received extract-text request");

        match state.analyzer.extract_text(&image).await {
            Ok(text) => Ok(Json(ExtractTextResponse { text })),
            Err(e) => {
                warn!("Text extraction failed: {}", e);
                Err(e.into())
            }
        }
    }
    .instrument(span)
    .await
}

/// Decode the request body by content type
async fn read_input(request: Request) -> Result<Submission, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;
        return read_multipart(multipart).await;
    }

    let body = Bytes::from_request(request, &())
        .await
        .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Submission::default());
    }

    let body: AnalyzeBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    Ok(body.into())
}

/// Collect the `statement`/`text`, `image` and `image_url` fields of a form
///
/// Empty fields count as absent, matching a form submitted without a file.
async fn read_multipart(mut multipart: Multipart) -> Result<Submission, ApiError> {
    let mut submission = Submission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("statement") | Some("text") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;
                if !value.trim().is_empty() {
                    submission.text = Some(value);
                }
            }
            Some("image") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;
                if !bytes.is_empty() {
                    submission.image = Some(bytes.to_vec());
                }
            }
            Some("image_url") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Rejected(e.status(), e.body_text()))?;
                if !value.trim().is_empty() {
                    submission.image_url = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    Ok(submission)
}

/// GET /health - Liveness and capability check
async fn health_check<L, R>(State(state): State<AppState<L, R>>) -> Json<HealthCheckResponse>
where
    L: LlmProvider<Error = LlmError> + Send + Sync + 'static,
    R: TextRecognizer<Error = OcrError> + Send + Sync + 'static,
{
    Json(HealthCheckResponse {
        status: "ok".to_string(),
        model: state.model.clone(),
        ocr_enabled: state.analyzer.ocr_enabled(),
    })
}

/// Create the axum router with all routes
///
/// The `/api/...` paths are the ones the web form and browser extension
/// post to. CORS is fully permissive so both can call the API from any
/// origin.
pub fn create_router<L, R>(state: AppState<L, R>) -> AxumRouter
where
    L: LlmProvider<Error = LlmError> + Send + Sync + 'static,
    R: TextRecognizer<Error = OcrError> + Send + Sync + 'static,
{
    let body_limit = state.max_upload_bytes;

    AxumRouter::new()
        .route("/analyze", post(analyze::<L, R>))
        .route("/api/analyze/", post(analyze::<L, R>))
        .route("/extract_text", post(extract_text::<L, R>))
        .route("/api/extract_text/", post(extract_text::<L, R>))
        .route("/health", get(health_check::<L, R>))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
