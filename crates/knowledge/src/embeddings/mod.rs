//! Embedding providers.
//!
//! Providers are configured as an ordered chain. [`bind_provider`] tries
//! them once at startup and the first that works is used for the rest of
//! the process. A persisted index built with a different provider is
//! rebuilt rather than mixed (see [`EmbeddingSpace`]).

pub mod provider;
pub mod providers;
pub mod space;

pub use provider::{create_provider, EmbeddingProvider};
pub use space::EmbeddingSpace;

use lexora_core::config::EmbeddingProviderConfig;
use lexora_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::{info, warn};

/// A provider bound for the process lifetime, with its batching setting.
#[derive(Debug, Clone)]
pub struct BoundProvider {
    pub provider: Arc<dyn EmbeddingProvider>,
    pub batch_size: usize,
}

/// Try each configured provider in order and bind the first that works.
///
/// # Errors
/// `Embedding` listing every failure if no provider could be created.
pub async fn bind_provider(
    chain: &[EmbeddingProviderConfig],
    default_endpoint: &str,
) -> AppResult<BoundProvider> {
    let mut failures = Vec::new();

    for (i, config) in chain.iter().enumerate() {
        match create_provider(config, default_endpoint).await {
            Ok(provider) => {
                if i > 0 {
                    warn!(
                        provider = %config.provider,
                        model = %config.model,
                        "Falling back to embedding provider; an index built with another provider will be rebuilt"
                    );
                }
                info!(space = %provider.space(), "Bound embedding provider");
                return Ok(BoundProvider {
                    provider,
                    batch_size: config.batch_size.max(1),
                });
            }
            Err(e) => {
                warn!(provider = %config.provider, model = %config.model, "Embedding provider unavailable: {}", e);
                failures.push(format!("{}/{}: {}", config.provider, config.model, e));
            }
        }
    }

    Err(AppError::Embedding(if failures.is_empty() {
        "No embedding providers configured".to_string()
    } else {
        format!("No embedding provider available: {}", failures.join("; "))
    }))
}

/// Embed texts in batches, checking the provider returned one vector of the
/// right size per text.
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Provider '{}' returned {} embeddings for {} texts",
                provider.provider_name(),
                vectors.len(),
                batch.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != provider.dimensions()) {
            return Err(AppError::Embedding(format!(
                "Provider '{}' returned a {}-dimensional vector, expected {}",
                provider.provider_name(),
                bad.len(),
                provider.dimensions()
            )));
        }
        embeddings.extend(vectors);
    }

    tracing::debug!(
        count = embeddings.len(),
        provider = provider.provider_name(),
        "Generated embeddings"
    );

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::trigram::TrigramProvider;

    #[derive(Debug)]
    struct ShortProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn provider_name(&self) -> &str {
            "short"
        }
        fn model_name(&self) -> &str {
            "short"
        }
        fn dimensions(&self) -> usize {
            4
        }
        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_bind_falls_back_in_order() {
        let chain = vec![
            EmbeddingProviderConfig {
                endpoint: Some("http://127.0.0.1:1".to_string()),
                ..EmbeddingProviderConfig::ollama("all-minilm", 384)
            },
            EmbeddingProviderConfig::trigram(128),
        ];

        let bound = bind_provider(&chain, "http://127.0.0.1:1").await.unwrap();
        assert_eq!(bound.provider.provider_name(), "trigram");
        assert_eq!(bound.provider.dimensions(), 128);
        assert_eq!(bound.batch_size, 256);
    }

    #[tokio::test]
    async fn test_bind_first_success_wins() {
        let chain = vec![
            EmbeddingProviderConfig::trigram(64),
            EmbeddingProviderConfig::trigram(128),
        ];
        let bound = bind_provider(&chain, "unused").await.unwrap();
        assert_eq!(bound.provider.dimensions(), 64);
    }

    #[tokio::test]
    async fn test_bind_empty_chain() {
        let result = bind_provider(&[], "unused").await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_embed_texts_batches_preserve_order() {
        let provider = TrigramProvider::new("hashed-trigram-v1", 32);
        let texts: Vec<String> = (0..7).map(|i| format!("text number {i}")).collect();

        let batched = embed_texts(&provider, &texts, 3).await.unwrap();
        let single = embed_texts(&provider, &texts, 100).await.unwrap();
        assert_eq!(batched, single);
        assert_eq!(batched.len(), 7);
    }

    #[tokio::test]
    async fn test_embed_texts_rejects_wrong_dimensions() {
        let result = embed_texts(&ShortProvider, &["a".to_string()], 8).await;
        assert!(matches!(result, Err(AppError::Embedding(msg)) if msg.contains("expected 4")));
    }
}
