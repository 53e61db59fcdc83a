//! Analysis pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::completion::ProviderId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Tunables for segmentation, gating, stance escalation, and backend calls.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Per-chunk word budget for module analyzers.
    pub max_chunk_words: usize,
    /// Hard cap on input length; longer input is rejected before any call.
    pub max_input_words: usize,
    /// A negative argument detection at or above this confidence rejects the input.
    pub gate_threshold: f64,
    /// Rule-based stance confidence at or above this is trusted without the model.
    pub stance_threshold: f64,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Provider tried first by the completion gateway.
    pub preferred_provider: Option<ProviderId>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_chunk_words: 2000,
            max_input_words: 50_000,
            gate_threshold: 0.7,
            stance_threshold: 0.6,
            temperature: 0.3,
            max_tokens: 4096,
            preferred_provider: None,
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file, filling unspecified fields with defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::info!(path = %path.display(), "loaded analysis config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chunk_words == 0 {
            return Err(ConfigError::Invalid("max_chunk_words must be > 0".into()));
        }
        if self.max_input_words < self.max_chunk_words {
            return Err(ConfigError::Invalid(format!(
                "max_input_words ({}) must be >= max_chunk_words ({})",
                self.max_input_words, self.max_chunk_words
            )));
        }
        for (name, value) in [
            ("gate_threshold", self.gate_threshold),
            ("stance_threshold", self.stance_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be in [0, 1]")));
            }
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be > 0".into()));
        }
        Ok(())
    }
}
