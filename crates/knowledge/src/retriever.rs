//! Query answering over the persisted index.

use crate::index::{IndexBuilder, SearchHit, VectorIndex};
use crate::progress::ProgressReporter;
use crate::source::DocumentSource;
use crate::types::{AnswerResult, BuildStats};
use convopilot_core::{AppError, AppResult};
use std::sync::Arc;

/// Answers queries against the persisted index, building it when needed.
///
/// Holds no index between calls; every call reads the persisted one.
pub struct Retriever {
    builder: IndexBuilder,
    source: Arc<dyn DocumentSource>,
    top_k: usize,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("builder", &self.builder)
            .field("source", &self.source.describe())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl Retriever {
    pub fn new(builder: IndexBuilder, source: Arc<dyn DocumentSource>, top_k: usize) -> Self {
        Self {
            builder,
            source,
            top_k: top_k.max(1),
        }
    }

    pub fn with_progress(self, progress: ProgressReporter) -> Self {
        Self {
            builder: self.builder.with_progress(progress),
            ..self
        }
    }

    pub fn builder(&self) -> &IndexBuilder {
        &self.builder
    }

    /// Unconditional full rebuild from the document source.
    pub async fn rebuild(&self) -> AppResult<BuildStats> {
        self.builder.build_from_source(self.source.as_ref()).await
    }

    /// Run a full build if no index is persisted. Returns whether one ran.
    pub async fn ensure_index(&self) -> AppResult<bool> {
        if self.builder.storage().exists() {
            return Ok(false);
        }

        tracing::info!(
            "No index at {:?}, building one",
            self.builder.storage().location()
        );
        self.rebuild().await?;
        Ok(true)
    }

    /// Load the persisted index, rebuilding and retrying exactly once on failure.
    ///
    /// An index built by a different embedding model counts as a failed load.
    pub async fn load_index(&self) -> AppResult<VectorIndex> {
        self.load_with_rebuild(true).await
    }

    async fn load_with_rebuild(&self, rebuild_on_failure: bool) -> AppResult<VectorIndex> {
        let first = match self.try_load() {
            Ok(index) => return Ok(index),
            Err(e) => e,
        };

        if !rebuild_on_failure {
            return Err(AppError::IndexLoad(format!(
                "freshly built index is unloadable: {}",
                first
            )));
        }

        tracing::warn!("Index load failed, rebuilding: {}", first);
        self.rebuild().await?;

        self.try_load().map_err(|second| {
            AppError::IndexLoad(format!("index still unloadable after rebuild: {}", second))
        })
    }

    fn try_load(&self) -> AppResult<VectorIndex> {
        let index = self.builder.storage().load()?;
        index.ensure_compatible(&self.builder.provider().identity())?;
        Ok(index)
    }

    /// Answer a query. Distances above `score_threshold` are rejected;
    /// a distance equal to it is accepted.
    ///
    /// A query whose embedding is the zero vector carries no searchable
    /// content and gets the not-enough-information sentinel.
    ///
    /// The caller validates the query.
    pub async fn answer(&self, query: &str, score_threshold: f32) -> AppResult<AnswerResult> {
        // A build that just ran counts as the one rebuild attempt
        let just_built = self.ensure_index().await?;
        let index = self.load_with_rebuild(!just_built).await?;

        let query_embedding = self.builder.provider().embed(query).await?;
        if query_embedding.iter().all(|&x| x == 0.0) {
            tracing::debug!("Query has no indexable content");
            return Ok(AnswerResult::not_enough_information());
        }

        let hits = index.search(&query_embedding, self.top_k)?;

        if let Some(best) = hits.first() {
            tracing::debug!(
                source = %best.chunk.source_id,
                distance = best.distance,
                threshold = score_threshold,
                candidates = hits.len(),
                "Best match"
            );
        }

        Ok(select_answer(&hits, score_threshold))
    }
}

/// Turn hits sorted by ascending distance into an answer.
pub fn select_answer(hits: &[SearchHit], score_threshold: f32) -> AnswerResult {
    let Some(best) = hits.first() else {
        return AnswerResult::not_enough_information();
    };

    if best.distance > score_threshold {
        return AnswerResult::no_relevant_results(best.distance);
    }

    let content = if best.chunk.full_text.is_empty() {
        hits.iter()
            .filter(|h| h.chunk.source_id == best.chunk.source_id)
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    } else {
        best.chunk.full_text.to_string()
    };

    AnswerResult::found(best.chunk.source_id.clone(), content, best.distance)
}
