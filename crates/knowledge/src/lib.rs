//! Document question answering over a semantic index.
//!
//! Raw documents are extracted to text, chunked, embedded and persisted as a
//! vector index in SQLite. Queries are answered with the full text of the
//! closest document, or a sentinel when nothing is close enough.

pub mod chunk;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod index;
pub mod progress;
pub mod retriever;
pub mod source;
pub mod types;

#[cfg(test)]
mod tests;

pub use chunk::{ChunkConfig, Chunker};
pub use embeddings::{EmbeddingConfig, EmbeddingProvider};
pub use index::{IndexBuilder, IndexStorage, SqliteIndexStorage, VectorIndex};
pub use progress::{BuildPhase, ProgressEvent, ProgressReporter};
pub use retriever::Retriever;
pub use source::{DirectorySource, DocumentHandle, DocumentSource, InMemorySource};
pub use types::{
    AnswerOutcome, AnswerResult, BuildStats, DistanceMetric, DocumentFormat, IndexStats,
    KnowledgeBaseConfig, ModelIdentity, RawDocument,
};

use convopilot_core::AppResult;
use std::path::Path;
use std::sync::Arc;

/// Entry point tying configuration, embedding backend, storage and retriever
/// together for one workspace.
#[derive(Debug)]
pub struct KnowledgeBase {
    config: KnowledgeBaseConfig,
    retriever: Retriever,
}

impl KnowledgeBase {
    /// Open the knowledge base of a workspace with its configuration file.
    pub async fn open(workspace: &Path, source: Arc<dyn DocumentSource>) -> AppResult<Self> {
        let config = config::load_config(workspace)?;
        Self::open_with_config(workspace, config, source).await
    }

    /// Open with an explicit configuration; the index still lives in the workspace.
    pub async fn open_with_config(
        workspace: &Path,
        config: KnowledgeBaseConfig,
        source: Arc<dyn DocumentSource>,
    ) -> AppResult<Self> {
        config::validate_config(&config)?;

        let provider = embeddings::create_provider(&config.embedding).await?;
        let storage = Arc::new(SqliteIndexStorage::new(config::get_index_path(workspace)));

        tracing::debug!(
            "Opened knowledge base in {:?} with {}",
            workspace,
            provider.identity()
        );

        Self::with_components(config, provider, storage, source)
    }

    /// Assemble from explicit collaborators.
    pub fn with_components(
        config: KnowledgeBaseConfig,
        provider: Arc<dyn EmbeddingProvider>,
        storage: Arc<dyn IndexStorage>,
        source: Arc<dyn DocumentSource>,
    ) -> AppResult<Self> {
        config::validate_config(&config)?;

        let builder = IndexBuilder::new(
            provider,
            storage,
            ChunkConfig::from(&config),
            config.metric,
            config.embedding.batch_size,
        )?;
        let retriever = Retriever::new(builder, source, config.top_k as usize);

        Ok(Self { config, retriever })
    }

    pub fn with_progress(self, progress: ProgressReporter) -> Self {
        Self {
            retriever: self.retriever.with_progress(progress),
            ..self
        }
    }

    pub fn config(&self) -> &KnowledgeBaseConfig {
        &self.config
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Full rebuild from the document source, replacing any existing index.
    pub async fn build(&self) -> AppResult<BuildStats> {
        self.retriever.rebuild().await
    }

    /// Build the index only if none is persisted.
    pub async fn ensure_index(&self) -> AppResult<bool> {
        self.retriever.ensure_index().await
    }

    /// Answer a query, using the configured threshold when none is given.
    pub async fn answer(&self, query: &str, score_threshold: Option<f32>) -> AppResult<AnswerResult> {
        let threshold = score_threshold.unwrap_or(self.config.score_threshold);
        tracing::info!("Answering query with threshold {}", threshold);
        self.retriever.answer(query, threshold).await
    }

    /// Delete the persisted index so the next query rebuilds it.
    pub fn invalidate(&self) -> AppResult<()> {
        self.retriever.builder().storage().remove()
    }

    /// Statistics of the persisted index. Does not build or rebuild.
    pub fn stats(&self) -> AppResult<IndexStats> {
        index_stats(self.retriever.builder().storage().as_ref())
    }
}

/// Statistics of a persisted index, without an embedding backend.
pub fn index_stats(storage: &dyn IndexStorage) -> AppResult<IndexStats> {
    let index = storage.load()?;

    let storage_bytes = std::fs::metadata(storage.location())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(IndexStats {
        model: index.model().clone(),
        metric: index.metric(),
        documents_count: index.documents().len() as u32,
        chunks_count: index.len() as u32,
        built_at: index.built_at(),
        storage_bytes,
    })
}
