//! Full index builds: extract, chunk, embed, persist.

use super::{IndexStorage, VectorIndex};
use crate::chunk::{ChunkConfig, Chunker};
use crate::embeddings::{embed_in_batches, EmbeddingProvider};
use crate::extract::extract_all;
use crate::progress::{BuildPhase, ProgressReporter};
use crate::source::DocumentSource;
use crate::types::{
    BuildStats, DistanceMetric, DocumentFormat, ExtractedDocument, IndexEntry, RawDocument,
};
use chrono::Utc;
use convopilot_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Builds a [`VectorIndex`] from raw documents and persists it.
///
/// Every build is a full replacement; nothing is merged with a previous index.
pub struct IndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    storage: Arc<dyn IndexStorage>,
    chunker: Chunker,
    metric: DistanceMetric,
    batch_size: usize,
    progress: ProgressReporter,
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("model", &self.provider.identity())
            .field("location", &self.storage.location())
            .field("chunker", &self.chunker)
            .field("metric", &self.metric)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl IndexBuilder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        storage: Arc<dyn IndexStorage>,
        chunking: ChunkConfig,
        metric: DistanceMetric,
        batch_size: usize,
    ) -> AppResult<Self> {
        Ok(Self {
            provider,
            storage,
            chunker: Chunker::new(chunking)?,
            metric,
            batch_size: batch_size.max(1),
            progress: ProgressReporter::noop(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    pub fn storage(&self) -> &Arc<dyn IndexStorage> {
        &self.storage
    }

    /// Build and persist an index from already-fetched documents.
    ///
    /// Fails with [`AppError::NoDocuments`] when no document could be
    /// extracted; the previous index, if any, is then left in place.
    pub async fn build(&self, raw_docs: Vec<RawDocument>) -> AppResult<BuildStats> {
        self.build_counting(raw_docs, 0).await
    }

    /// List, fetch and index every supported document of a source.
    ///
    /// A listing failure counts as an empty listing. Unsupported formats and
    /// failed fetches are skipped.
    pub async fn build_from_source(&self, source: &dyn DocumentSource) -> AppResult<BuildStats> {
        tracing::info!("Collecting documents from {}", source.describe());

        let handles = match source.list_documents().await {
            Ok(handles) => handles,
            Err(e) => {
                tracing::warn!("Listing documents from {} failed: {}", source.describe(), e);
                Vec::new()
            }
        };

        let total = handles.len() as u64;
        let mut raw_docs = Vec::new();
        let mut skipped = 0u32;

        for (i, handle) in handles.iter().enumerate() {
            self.progress
                .emit(BuildPhase::List, i as u64 + 1, Some(total), &handle.name);

            let Some(format) = DocumentFormat::from_name(&handle.name) else {
                tracing::debug!("Skipping unsupported document '{}'", handle.name);
                skipped += 1;
                continue;
            };

            match source.fetch(handle).await {
                Ok(content) => raw_docs.push(RawDocument::new(&handle.name, format, content)),
                Err(e) => {
                    tracing::warn!("Failed to fetch '{}': {}", handle.name, e);
                    skipped += 1;
                }
            }
        }

        self.build_counting(raw_docs, skipped).await
    }

    async fn build_counting(
        &self,
        raw_docs: Vec<RawDocument>,
        already_skipped: u32,
    ) -> AppResult<BuildStats> {
        let start = Instant::now();
        let bytes_processed: u64 = raw_docs.iter().map(|d| d.content.len() as u64).sum();

        tracing::info!(
            "Building index from {} documents ({} bytes)",
            raw_docs.len(),
            bytes_processed
        );

        // 1. Extract, skipping failures, then repeated names among the successes
        let (extracted, failures) = extract_all(&raw_docs);

        let mut seen = HashSet::new();
        let mut duplicates = 0u32;
        let documents: Vec<ExtractedDocument> = extracted
            .into_iter()
            .filter(|d| {
                let fresh = seen.insert(d.source_id.clone());
                if !fresh {
                    tracing::warn!("Skipping duplicate document name '{}'", d.source_id);
                    duplicates += 1;
                }
                fresh
            })
            .collect();

        self.progress.emit(
            BuildPhase::Extract,
            documents.len() as u64,
            Some(raw_docs.len() as u64),
            format!("{} failed", failures.len()),
        );

        // 2. Nothing extracted, nothing persisted
        if documents.is_empty() {
            return Err(AppError::NoDocuments(format!(
                "no supported document could be extracted ({} failed, {} skipped)",
                failures.len(),
                already_skipped + duplicates
            )));
        }

        // 3. Chunk
        let full_texts: HashMap<&str, &Arc<str>> = documents
            .iter()
            .map(|d| (d.source_id.as_str(), &d.text))
            .collect();

        let mut chunks = self.chunker.split(&documents);

        // 4. Re-attach full texts by source
        for chunk in &mut chunks {
            chunk.full_text = full_texts
                .get(chunk.source_id.as_str())
                .map(|t| Arc::clone(t))
                .unwrap_or_else(|| Arc::from(""));
        }

        self.progress.emit(
            BuildPhase::Chunk,
            chunks.len() as u64,
            None,
            format!("{} chunks from {} documents", chunks.len(), documents.len()),
        );

        // 5. Embed
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_in_batches(self.provider.as_ref(), &texts, self.batch_size).await?;
        self.progress.emit(
            BuildPhase::Embed,
            embeddings.len() as u64,
            Some(texts.len() as u64),
            self.provider.identity().to_string(),
        );

        let entries: Vec<IndexEntry> = embeddings
            .into_iter()
            .zip(chunks)
            .map(|(embedding, chunk)| IndexEntry { embedding, chunk })
            .collect();

        // 6. Persist, replacing any previous index
        let documents_indexed = documents.len() as u32;
        let chunks_indexed = entries.len() as u32;

        let index = VectorIndex::new(
            self.provider.identity(),
            self.metric,
            Utc::now(),
            documents,
            entries,
        )?;
        self.storage.save(&index)?;
        self.progress.emit(
            BuildPhase::Persist,
            1,
            Some(1),
            self.storage.location().display().to_string(),
        );

        let stats = BuildStats {
            documents_indexed,
            documents_skipped: already_skipped + duplicates + failures.len() as u32,
            chunks_indexed,
            bytes_processed,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        tracing::info!(
            "Index built: {} documents, {} chunks, {} skipped in {:.2}s",
            stats.documents_indexed,
            stats.chunks_indexed,
            stats.documents_skipped,
            stats.duration_secs
        );

        Ok(stats)
    }
}
