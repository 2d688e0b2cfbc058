//! Generation provider factory.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crate::types::{LlmSettings, ProviderType};
use lexora_core::{AppError, AppResult};
use std::sync::Arc;

/// Create a generation client from settings.
///
/// # Errors
/// Returns `Config` if the provider is unknown or the HTTP client cannot be built.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    match ProviderType::parse(&settings.provider) {
        Some(ProviderType::Ollama) => {
            let client = OllamaClient::new(&settings.endpoint, settings.timeout)?;
            Ok(Arc::new(client))
        }
        None => Err(AppError::Config(format!(
            "Unknown provider: {}",
            settings.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(provider: &str) -> LlmSettings {
        LlmSettings {
            provider: provider.to_string(),
            endpoint: "http://localhost:8080".to_string(),
            model: "mistral".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(&settings("ollama")).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client(&settings("unknown")) {
            Err(AppError::Config(msg)) => assert!(msg.contains("Unknown provider")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
