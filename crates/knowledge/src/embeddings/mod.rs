//! Embedding backends.
//!
//! The pipeline only talks to [`EmbeddingProvider`]; which backend sits
//! behind it is decided by [`EmbeddingConfig`] at startup.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use convopilot_core::{AppError, AppResult};

/// Embed texts in batches of at most `batch_size`, checking every vector's length.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Embedding {} texts with {}/{}",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let mut embeddings = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Provider returned {} embeddings for a batch of {}",
                vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(vectors);
    }

    if let Some(bad) = embeddings.iter().find(|e| e.len() != provider.dimensions()) {
        return Err(AppError::Embedding(format!(
            "Embedding dimension mismatch: got {}, expected {}",
            bad.len(),
            provider.dimensions()
        )));
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::trigram::TrigramProvider;

    #[derive(Debug)]
    struct ShortProvider;

    #[async_trait::async_trait]
    impl EmbeddingProvider for ShortProvider {
        fn provider_name(&self) -> &str {
            "short"
        }

        fn model_name(&self) -> &str {
            "short-v1"
        }

        fn dimensions(&self) -> usize {
            4
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn test_batches_preserve_order() {
        let provider = TrigramProvider::new(64);
        let texts: Vec<String> = (0..7).map(|i| format!("document number {}", i)).collect();

        let batched = embed_in_batches(&provider, &texts, 3).await.unwrap();
        let single = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(batched, single);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider = TrigramProvider::new(64);
        assert!(embed_in_batches(&provider, &[], 8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_error() {
        let result = embed_in_batches(&ShortProvider, &["x".to_string()], 8).await;
        assert!(matches!(result, Err(AppError::Embedding(_))));
    }
}
