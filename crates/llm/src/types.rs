//! Generation provider settings.

use lexora_core::AppConfig;
use std::time::Duration;

/// Settings needed to construct a generation client.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmSettings {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            endpoint: config.llm_endpoint.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }
}

/// Provider type enum for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    Ollama,
}

impl ProviderType {
    /// Parse provider type from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
        }
    }
}
