//! Knowledge pipeline type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::embeddings::EmbeddingConfig;

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Characters of the previous chunk repeated at the start of the next
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Number of nearest chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Maximum accepted distance for the best match
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Distance metric used for search
    #[serde(default)]
    pub metric: DistanceMetric,

    /// Embedding backend settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_chunk_size() -> u32 {
    500
}

fn default_chunk_overlap() -> u32 {
    50
}

fn default_top_k() -> u32 {
    10
}

fn default_score_threshold() -> f32 {
    1.0
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            metric: DistanceMetric::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    PlainText,
    Docx,
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from a document name's extension.
    ///
    /// Returns `None` for unsupported formats, which callers skip.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();

        match ext.as_str() {
            "txt" => Some(Self::PlainText),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plaintext",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }
}

/// A document as fetched from a document source.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Identifier, usually the file name
    pub name: String,

    pub format: DocumentFormat,

    /// Undecoded document bytes
    pub content: Vec<u8>,
}

impl RawDocument {
    pub fn new(name: impl Into<String>, format: DocumentFormat, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            format,
            content,
        }
    }
}

/// Plain text of one document, kept verbatim for whole-document answers.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub source_id: String,

    /// Full text, never truncated
    pub text: Arc<str>,

    /// Length of `text` in characters
    pub length: usize,
}

impl ExtractedDocument {
    pub fn new(source_id: impl Into<String>, text: &str) -> Self {
        Self {
            source_id: source_id.into(),
            text: Arc::from(text),
            length: text.chars().count(),
        }
    }
}

/// A bounded slice of a document's text, the unit of embedding and search.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Identifier of the source document
    pub source_id: String,

    /// Position within the source (0-indexed)
    pub position: u32,

    /// Chunk text content
    pub text: String,

    /// Byte range of `text` within the source's full text
    pub byte_range: (usize, usize),

    /// Shared full text of the source document
    pub full_text: Arc<str>,
}

/// One embedded chunk inside a [`crate::index::VectorIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub embedding: Vec<f32>,
    pub chunk: Chunk,
}

/// Identity of the embedding model that produced an index.
///
/// Query and index embeddings are only comparable when these match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub provider: String,
    pub model: String,
    pub dimensions: usize,
}

impl std::fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({} dims)", self.provider, self.model, self.dimensions)
    }
}

/// Distance between embeddings; lower means more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance
    #[default]
    SquaredL2,
    /// One minus cosine similarity
    Cosine,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::SquaredL2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Self::Cosine => {
                let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

                if norm_a == 0.0 || norm_b == 0.0 {
                    return 1.0;
                }

                1.0 - dot / (norm_a * norm_b)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SquaredL2 => "squared_l2",
            Self::Cosine => "cosine",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "squared_l2" => Some(Self::SquaredL2),
            "cosine" => Some(Self::Cosine),
            _ => None,
        }
    }
}

/// How a query was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    Found,
    /// The index returned no candidates at all
    NotEnoughInformation,
    /// The best candidate was farther than the threshold
    NoRelevantResults,
}

/// Response text shown when the index has nothing to offer.
pub const NOT_ENOUGH_INFORMATION: &str =
    "Good question, we don't have enough information to answer that.";

/// Response text shown when the best match is too far from the query.
pub const NO_RELEVANT_RESULTS: &str = "No relevant results found based on the threshold.";

/// Result of answering one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Text to show the user (formatted answer or a sentinel)
    pub response: String,

    /// Full text of the matched document, for display or download
    pub full_document: Option<String>,

    pub outcome: AnswerOutcome,

    /// Source identifier of the best match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Distance of the best match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl AnswerResult {
    pub fn not_enough_information() -> Self {
        Self::sentinel(NOT_ENOUGH_INFORMATION, AnswerOutcome::NotEnoughInformation, None)
    }

    pub fn no_relevant_results(best_distance: f32) -> Self {
        Self::sentinel(
            NO_RELEVANT_RESULTS,
            AnswerOutcome::NoRelevantResults,
            Some(best_distance),
        )
    }

    fn sentinel(response: &str, outcome: AnswerOutcome, distance: Option<f32>) -> Self {
        Self {
            response: response.to_string(),
            full_document: None,
            outcome,
            source: None,
            distance,
        }
    }

    /// Build a successful answer around a document's content.
    pub fn found(source: String, content: String, distance: f32) -> Self {
        Self {
            response: format!("**Answer:**\n\n{}", content),
            full_document: Some(content),
            outcome: AnswerOutcome::Found,
            source: Some(source),
            distance: Some(distance),
        }
    }

    pub fn is_found(&self) -> bool {
        self.outcome == AnswerOutcome::Found
    }
}

/// Statistics from an index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildStats {
    /// Documents extracted and indexed
    pub documents_indexed: u32,

    /// Documents skipped (unsupported, unfetchable or unextractable)
    pub documents_skipped: u32,

    /// Chunks embedded into the index
    pub chunks_indexed: u32,

    /// Raw bytes read from the source
    pub bytes_processed: u64,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for a persisted index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub model: ModelIdentity,
    pub metric: DistanceMetric,
    pub documents_count: u32,
    pub chunks_count: u32,
    pub built_at: DateTime<Utc>,

    /// Size of the index file in bytes
    pub storage_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_name() {
        assert_eq!(DocumentFormat::from_name("notes.txt"), Some(DocumentFormat::PlainText));
        assert_eq!(DocumentFormat::from_name("Policy.DOCX"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_name("a/b/report.pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_name("slides.pptx"), None);
        assert_eq!(DocumentFormat::from_name("README"), None);
    }

    #[test]
    fn test_extracted_document_length_counts_chars() {
        let doc = ExtractedDocument::new("a.txt", "héllo");
        assert_eq!(doc.length, 5);
        assert_eq!(&*doc.text, "héllo");
    }

    #[test]
    fn test_squared_l2_distance() {
        let d = DistanceMetric::SquaredL2.distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert_eq!(d, 2.0);
        assert_eq!(DistanceMetric::SquaredL2.distance(&[0.5, 0.5], &[0.5, 0.5]), 0.0);
    }

    #[test]
    fn test_cosine_distance() {
        let same = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[2.0, 0.0]);
        assert!(same.abs() < 1e-6);

        let orthogonal = DistanceMetric::Cosine.distance(&[1.0, 0.0], &[0.0, 3.0]);
        assert!((orthogonal - 1.0).abs() < 1e-6);

        // Zero vectors are treated as orthogonal to everything
        assert_eq!(DistanceMetric::Cosine.distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_metric_round_trips_through_str() {
        for metric in [DistanceMetric::SquaredL2, DistanceMetric::Cosine] {
            assert_eq!(DistanceMetric::parse(metric.as_str()), Some(metric));
        }
        assert_eq!(DistanceMetric::parse("manhattan"), None);
    }

    #[test]
    fn test_found_answer_formats_content() {
        let answer = AnswerResult::found("a.txt".to_string(), "Body".to_string(), 0.25);
        assert!(answer.is_found());
        assert_eq!(answer.response, "**Answer:**\n\nBody");
        assert_eq!(answer.full_document.as_deref(), Some("Body"));
    }

    #[test]
    fn test_sentinels_have_no_document() {
        let none = AnswerResult::not_enough_information();
        assert_eq!(none.response, NOT_ENOUGH_INFORMATION);
        assert!(none.full_document.is_none());

        let far = AnswerResult::no_relevant_results(3.0);
        assert_eq!(far.response, NO_RELEVANT_RESULTS);
        assert_eq!(far.outcome, AnswerOutcome::NoRelevantResults);
        assert!(far.full_document.is_none());
    }
}
