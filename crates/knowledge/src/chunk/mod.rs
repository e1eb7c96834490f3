//! Recursive text chunking.
//!
//! Splitting is delegated to `text-splitter`, which divides text at the
//! largest semantic boundary that fits (paragraph, sentence, word, grapheme)
//! and measures capacity in characters. Trimming is disabled so the chunks of
//! a document cover its text without gaps.

use crate::types::{Chunk, ExtractedDocument, KnowledgeBaseConfig};
use convopilot_core::{AppError, AppResult};
use std::sync::Arc;
use text_splitter::{ChunkConfig as SplitterConfig, TextSplitter};

/// Chunk size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl From<&KnowledgeBaseConfig> for ChunkConfig {
    fn from(config: &KnowledgeBaseConfig) -> Self {
        Self {
            chunk_size: config.chunk_size as usize,
            overlap: config.chunk_overlap as usize,
        }
    }
}

/// Splits extracted documents into overlapping chunks.
pub struct Chunker {
    config: ChunkConfig,
    splitter: TextSplitter<text_splitter::Characters>,
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker").field("config", &self.config).finish()
    }
}

impl Chunker {
    pub fn new(config: ChunkConfig) -> AppResult<Self> {
        config.validate()?;

        let splitter_config = SplitterConfig::new(config.chunk_size)
            .with_overlap(config.overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunk configuration: {}", e)))?
            .with_trim(false);

        Ok(Self {
            config,
            splitter: TextSplitter::new(splitter_config),
        })
    }

    pub fn config(&self) -> ChunkConfig {
        self.config
    }

    /// Split one document. Every chunk shares the document's full text.
    pub fn split_document(&self, doc: &ExtractedDocument) -> Vec<Chunk> {
        self.split_text(&doc.source_id, &doc.text)
    }

    /// Split a batch of documents, preserving document order.
    pub fn split(&self, docs: &[ExtractedDocument]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = docs.iter().flat_map(|d| self.split_document(d)).collect();

        tracing::debug!(
            "Chunking complete: {} chunks from {} documents",
            chunks.len(),
            docs.len()
        );

        chunks
    }

    fn split_text(&self, source_id: &str, full_text: &Arc<str>) -> Vec<Chunk> {
        self.splitter
            .chunk_indices(full_text)
            .enumerate()
            .map(|(position, (offset, text))| Chunk {
                source_id: source_id.to_string(),
                position: position as u32,
                text: text.to_string(),
                byte_range: (offset, offset + text.len()),
                full_text: Arc::clone(full_text),
            })
            .collect()
    }
}

/// Rebuild a document's text from its chunks, dropping overlapped bytes.
///
/// Expects the chunks of a single source in position order.
pub fn reassemble(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut covered_end = 0usize;

    for chunk in chunks {
        let (start, end) = chunk.byte_range;
        if end <= covered_end {
            continue;
        }
        let skip = covered_end.saturating_sub(start);
        text.push_str(&chunk.text[skip..]);
        covered_end = end;
    }

    text
}
