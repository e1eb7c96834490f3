//! In-memory vector index and its persistence.

mod builder;
mod storage;

pub use builder::IndexBuilder;
pub use storage::{IndexStorage, SqliteIndexStorage, INDEX_FORMAT_VERSION};

use crate::types::{Chunk, DistanceMetric, ExtractedDocument, IndexEntry, ModelIdentity};
use chrono::{DateTime, Utc};
use convopilot_core::{AppError, AppResult};

/// A searchable collection of embedded chunks.
///
/// Built wholesale from one batch of documents and never updated in place.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    model: ModelIdentity,
    metric: DistanceMetric,
    built_at: DateTime<Utc>,
    documents: Vec<ExtractedDocument>,
    entries: Vec<IndexEntry>,
}

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub distance: f32,
}

impl VectorIndex {
    /// Assemble an index, checking every embedding has the model's dimensions.
    pub fn new(
        model: ModelIdentity,
        metric: DistanceMetric,
        built_at: DateTime<Utc>,
        documents: Vec<ExtractedDocument>,
        entries: Vec<IndexEntry>,
    ) -> AppResult<Self> {
        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.len() != model.dimensions)
        {
            return Err(AppError::Knowledge(format!(
                "Embedding for '{}' chunk {} has {} dimensions, index expects {}",
                bad.chunk.source_id,
                bad.chunk.position,
                bad.embedding.len(),
                model.dimensions
            )));
        }

        Ok(Self {
            model,
            metric,
            built_at,
            documents,
            entries,
        })
    }

    pub fn model(&self) -> &ModelIdentity {
        &self.model
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn documents(&self) -> &[ExtractedDocument] {
        &self.documents
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reject an index whose embeddings came from a different model.
    pub fn ensure_compatible(&self, active: &ModelIdentity) -> AppResult<()> {
        if &self.model != active {
            return Err(AppError::IndexLoad(format!(
                "Index was built with {} but the active embedding model is {}",
                self.model, active
            )));
        }
        Ok(())
    }

    /// Exhaustive nearest-neighbour search.
    ///
    /// Returns at most `k` hits sorted by ascending distance. Ties keep
    /// insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if query.len() != self.model.dimensions {
            return Err(AppError::Embedding(format!(
                "Query embedding has {} dimensions, index expects {}",
                query.len(),
                self.model.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, self.metric.distance(query, &e.embedding)))
            .collect();

        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);

        tracing::debug!(
            "Retrieved {} of {} chunks (requested top-{})",
            scored.len(),
            self.entries.len(),
            k
        );

        Ok(scored
            .into_iter()
            .map(|(i, distance)| SearchHit {
                chunk: self.entries[i].chunk.clone(),
                distance,
            })
            .collect())
    }
}
