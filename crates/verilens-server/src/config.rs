//! Configuration file parsing for the server.
//!
//! Loads settings from TOML files: bind address, upload and download
//! limits, model provider, OCR engine and analyzer limits. Credentials are
//! never read from the file; the file only names the environment variable
//! holding them.

use crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use verilens_analyzer::{AnalyzerConfig, DEFAULT_LANGUAGE, DEFAULT_OCR_TIMEOUT_SECS, DEFAULT_TESSERACT_CMD};
use verilens_llm::gemini::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),

    /// Provider credential not present in the environment
    #[error("Environment variable {0} is not set; it must hold the model provider API key")]
    MissingApiKey(String),

    /// Field present but unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 8000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Largest accepted request body, uploads included (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Time allowed to download an image given by URL (seconds)
    #[serde(default = "default_image_fetch_timeout_secs")]
    pub image_fetch_timeout_secs: u64,

    /// Model provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// OCR settings
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Analyzer limits
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
}

/// Model provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API root
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    /// HTTP timeout for one generation request (seconds)
    pub timeout_secs: u64,
}

/// OCR configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Accept image uploads
    pub enabled: bool,

    /// Tesseract executable
    pub command: PathBuf,

    /// Recognition language
    pub language: String,

    /// Time allowed for one recognition run (seconds)
    pub timeout_secs: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8000
}

/// Default upload limit: 10 MiB
fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_image_fetch_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    /// HTTP timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(self.api_key_env.clone()))
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: PathBuf::from(DEFAULT_TESSERACT_CMD),
            language: DEFAULT_LANGUAGE.to_string(),
            timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
        }
    }
}

impl OcrConfig {
    /// Recognition timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in configuration for local development
    pub fn development() -> Self {
        ServerConfig {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            max_upload_bytes: default_max_upload_bytes(),
            image_fetch_timeout_secs: default_image_fetch_timeout_secs(),
            provider: ProviderConfig::default(),
            ocr: OcrConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }

    /// Check required fields and limits
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("provider.base_url".to_string()));
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::MissingField("provider.model".to_string()));
        }
        if self.provider.api_key_env.trim().is_empty() {
            return Err(ConfigError::MissingField("provider.api_key_env".to_string()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be greater than 0".to_string()));
        }
        if self.ocr.enabled && self.ocr.timeout_secs == 0 {
            return Err(ConfigError::Invalid("ocr.timeout_secs must be greater than 0".to_string()));
        }
        if self.image_fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("image_fetch_timeout_secs must be greater than 0".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("max_upload_bytes must be greater than 0".to_string()));
        }
        self.analyzer
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("analyzer: {}", e)))
    }

    /// Image download timeout as a Duration
    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.image_fetch_timeout_secs)
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}
