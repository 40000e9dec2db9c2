//! Download of images referenced by URL.
//!
//! The browser extension sends the address of an image on the page rather
//! than its bytes. Downloads are limited to http(s), bounded in size by the
//! upload limit and in time by a client timeout.

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Default time allowed for one image download (seconds)
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

/// Image download error
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is malformed or not http(s)
    #[error("Unsupported image URL: {0}")]
    InvalidUrl(String),

    /// Connection failed or timed out
    #[error("Image download failed: {0}")]
    Communication(String),

    /// Remote server answered with a non-success status
    #[error("Image download failed: HTTP {0}")]
    Status(u16),

    /// Image is larger than the upload limit
    #[error("Image exceeds the {0} byte limit")]
    TooLarge(usize),
}

/// Fetches remote images with a shared HTTP client
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl ImageFetcher {
    /// Create a fetcher accepting images up to `max_bytes`
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Communication(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, max_bytes })
    }

    /// Download the image at `url`
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "{}: only http and https are supported",
                url
            )));
        }

        debug!(host = url.host_str().unwrap_or_default(), "Downloading image");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Communication(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(FetchError::TooLarge(self.max_bytes));
        }

        // Content-Length may be absent or wrong; enforce the limit while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchError::Communication(e.to_string()))?
        {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge(self.max_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(bytes = bytes.len(), "Downloaded image");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tokio::net::TcpListener;

    /// Serve a few fixed images on an ephemeral local port
    async fn spawn_image_server() -> String {
        let app = Router::new()
            .route("/small.png", get(|| async { b"\x89PNG small".to_vec() }))
            .route("/large.png", get(|| async { vec![0u8; 4096] }))
            .route("/missing.png", get(|| async { StatusCode::NOT_FOUND }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fetcher(max_bytes: usize) -> ImageFetcher {
        ImageFetcher::new(Duration::from_secs(5), max_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_image() {
        let base = spawn_image_server().await;
        let bytes = fetcher(1024).fetch(&format!("{}/small.png", base)).await.unwrap();
        assert_eq!(bytes, b"\x89PNG small");
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_image() {
        let base = spawn_image_server().await;
        let err = fetcher(1024)
            .fetch(&format!("{}/large.png", base))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::TooLarge(1024)));
    }

    #[tokio::test]
    async fn test_fetch_reports_http_status() {
        let base = spawn_image_server().await;
        let err = fetcher(1024)
            .fetch(&format!("{}/missing.png", base))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_other_schemes() {
        for url in ["file:///etc/passwd", "data:image/png;base64,AAAA", "not a url"] {
            let err = fetcher(1024).fetch(url).await.unwrap_err();
            assert!(matches!(err, FetchError::InvalidUrl(_)), "{}", url);
        }
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        let err = fetcher(1024)
            .fetch("http://127.0.0.1:9/image.png")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Communication(_)));
    }
}
