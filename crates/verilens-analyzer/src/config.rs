//! Configuration for the Analyzer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the Analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum input text length (characters)
    pub max_text_length: usize,

    /// Maximum time for a single model call (seconds)
    pub model_call_timeout_secs: u64,
}

impl AnalyzerConfig {
    /// Get the model call timeout as a Duration
    pub fn model_call_timeout(&self) -> Duration {
        Duration::from_secs(self.model_call_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }
        if self.model_call_timeout_secs == 0 {
            return Err("model_call_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_text_length: 10_000,
            model_call_timeout_secs: 90,
        }
    }
}
