//! Embedding provider trait and factory.

use super::providers::{ollama::OllamaProvider, trigram::TrigramProvider};
use super::space::EmbeddingSpace;
use lexora_core::config::EmbeddingProviderConfig;
use lexora_core::{AppError, AppResult};
use std::sync::Arc;

/// Maps text to fixed-length vectors. Implementations must be deterministic:
/// the same text always yields the same vector.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Provider name (e.g., "ollama", "trigram")
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }

    fn space(&self) -> EmbeddingSpace {
        EmbeddingSpace::new(self.provider_name(), self.model_name(), self.dimensions())
    }
}

/// Create one provider from its configuration.
///
/// Remote providers are probed before being returned, so a provider that
/// comes back from here is usable.
pub async fn create_provider(
    config: &EmbeddingProviderConfig,
    default_endpoint: &str,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "trigram" => Ok(Arc::new(TrigramProvider::new(&config.model, config.dimensions))),

        "ollama" => {
            let endpoint = config.endpoint.as_deref().unwrap_or(default_endpoint);
            let provider = OllamaProvider::new(endpoint, &config.model, config.dimensions).await?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: ollama, trigram",
            config.provider
        ))),
    }
}
