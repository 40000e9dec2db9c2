//! Text recognition for uploaded screenshots
//!
//! Uploads are staged in a uniquely named temporary file so concurrent
//! requests never share a path. The file is removed when the staging guard
//! drops, whether recognition succeeded, failed or was cancelled.

use crate::error::OcrError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};
use verilens_domain::TextRecognizer;

/// Default Tesseract executable, resolved through `PATH`
pub const DEFAULT_TESSERACT_CMD: &str = "tesseract";

/// Default recognition language
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Default timeout for one recognition run (30 seconds)
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;

const TEMP_PREFIX: &str = "verilens-upload-";
const TEMP_SUFFIX: &str = ".img";

/// Runs the Tesseract command-line engine
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: PathBuf,
    language: String,
    timeout: Duration,
}

impl TesseractRecognizer {
    /// Create a recognizer for the given executable
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(DEFAULT_OCR_TIMEOUT_SECS),
        }
    }

    /// Set the recognition language (e.g., "eng", "eng+deu")
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the time allowed for one run
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for TesseractRecognizer {
    fn default() -> Self {
        Self::new(DEFAULT_TESSERACT_CMD)
    }
}

impl TextRecognizer for TesseractRecognizer {
    type Error = OcrError;

    async fn recognize(&self, image_path: &Path) -> Result<String, Self::Error> {
        let mut command = Command::new(&self.command);
        command
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| OcrError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| {
                OcrError::Unavailable(format!("failed to launch {}: {}", self.command.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(OcrError::Recognition(if stderr.is_empty() {
                format!("tesseract exited with {}", output.status)
            } else {
                stderr
            }));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Stages image bytes on disk and runs a recognizer over them
#[derive(Debug, Clone)]
pub struct OcrAdapter<R> {
    recognizer: R,
    temp_dir: Option<PathBuf>,
}

impl<R> OcrAdapter<R>
where
    R: TextRecognizer<Error = OcrError>,
{
    /// Create an adapter staging uploads in the system temp directory
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            temp_dir: None,
        }
    }

    /// Stage uploads in `dir` instead of the system temp directory
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Recognise the text in an uploaded image
    ///
    /// Returns the recognised text with surrounding whitespace trimmed.
    pub async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        if image.is_empty() {
            return Err(OcrError::EmptyImage);
        }

        let staged = self.stage(image)?;
        debug!(path = %staged.path().display(), bytes = image.len(), "Staged upload for OCR");

        let result = self.recognizer.recognize(staged.path()).await;

        if let Err(e) = staged.close() {
            warn!("Failed to remove staged upload: {}", e);
        }

        let text = result?.trim().to_string();
        debug!(chars = text.len(), "OCR finished");
        Ok(text)
    }

    fn stage(&self, image: &[u8]) -> Result<NamedTempFile, OcrError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);

        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(image)?;
        file.flush()?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Reads the staged file back as UTF-8 and records where it was
    #[derive(Clone, Default)]
    struct EchoRecognizer {
        seen: Arc<Mutex<Vec<PathBuf>>>,
        delay: Duration,
    }

    impl TextRecognizer for EchoRecognizer {
        type Error = OcrError;

        async fn recognize(&self, image_path: &Path) -> Result<String, Self::Error> {
            assert!(image_path.exists(), "staged file must exist during recognition");
            self.seen.lock().unwrap().push(image_path.to_path_buf());
            tokio::time::sleep(self.delay).await;
            let bytes = std::fs::read(image_path)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }

    #[derive(Clone, Default)]
    struct FailingRecognizer {
        seen: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl TextRecognizer for FailingRecognizer {
        type Error = OcrError;

        async fn recognize(&self, image_path: &Path) -> Result<String, Self::Error> {
            self.seen.lock().unwrap().push(image_path.to_path_buf());
            Err(OcrError::Recognition("unsupported image format".to_string()))
        }
    }

    #[tokio::test]
    async fn test_extract_text_trims_and_cleans_up() {
        let recognizer = EchoRecognizer::default();
        let adapter = OcrAdapter::new(recognizer.clone());

        let text = adapter.extract_text(b"\n  Earth is flat \n\n").await.unwrap();
        assert_eq!(text, "Earth is flat");

        let seen = recognizer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let name = seen[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(TEMP_PREFIX));
        assert!(!seen[0].exists(), "staged file must be removed after success");
    }

    #[tokio::test]
    async fn test_failure_still_cleans_up() {
        let recognizer = FailingRecognizer::default();
        let adapter = OcrAdapter::new(recognizer.clone());

        let err = adapter.extract_text(b"garbage").await.unwrap_err();
        assert!(matches!(err, OcrError::Recognition(_)));

        let seen = recognizer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].exists(), "staged file must be removed after failure");
    }

    #[tokio::test]
    async fn test_empty_image_is_rejected_before_staging() {
        let recognizer = EchoRecognizer::default();
        let adapter = OcrAdapter::new(recognizer.clone());

        assert!(matches!(adapter.extract_text(b"").await, Err(OcrError::EmptyImage)));
        assert!(recognizer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_temp_dir_is_left_empty() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = OcrAdapter::new(EchoRecognizer::default()).with_temp_dir(dir.path());

        adapter.extract_text(b"hello").await.unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_uploads_do_not_collide() {
        let recognizer = EchoRecognizer {
            seen: Arc::default(),
            delay: Duration::from_millis(50),
        };
        let adapter = Arc::new(OcrAdapter::new(recognizer.clone()));

        let mut handles = Vec::new();
        for i in 0..8 {
            let adapter = Arc::clone(&adapter);
            handles.push(tokio::spawn(async move {
                let payload = format!("upload number {}", i);
                let text = adapter.extract_text(payload.as_bytes()).await.unwrap();
                assert_eq!(text, payload);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut seen = recognizer.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 8);
        assert!(seen.iter().all(|path| !path.exists()));
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 8, "every upload must get its own file");
    }

    #[tokio::test]
    async fn test_missing_tesseract_binary_is_unavailable() {
        let adapter = OcrAdapter::new(TesseractRecognizer::new("/nonexistent/tesseract-binary"));
        let err = adapter.extract_text(b"not really an image").await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)), "{:?}", err);
    }

    /// Requires Tesseract and an image containing "Earth is flat" at
    /// `VERILENS_OCR_SAMPLE`.
    #[tokio::test]
    #[ignore]
    async fn test_tesseract_reads_sample_image() {
        let Ok(sample) = std::env::var("VERILENS_OCR_SAMPLE") else {
            return;
        };
        let image = std::fs::read(sample).unwrap();
        let adapter = OcrAdapter::new(TesseractRecognizer::default());

        let text = adapter.extract_text(&image).await.unwrap();
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(normalized.contains("Earth is flat"), "got: {}", text);
    }
}
