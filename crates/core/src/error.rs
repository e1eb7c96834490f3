//! Error types for ConvoPilot.
//!
//! A single error enum covers configuration, I/O, embedding and retrieval
//! failures. The retrieval taxonomy (extraction, empty corpus, unloadable
//! index) gets dedicated variants so callers can match on them and render a
//! specific message.

use thiserror::Error;

/// Generic reply when nothing more specific can be said.
pub const FALLBACK_MESSAGE: &str =
    "I'm not sure how to help with that. Please ask something related to the documents.";

/// Unified error type for ConvoPilot.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Embedding backend errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A single document could not be converted to text.
    ///
    /// Absorbed by the index builder; never fatal to a batch.
    #[error("Extraction error for '{source_id}': {reason}")]
    Extraction { source_id: String, reason: String },

    /// No document could be extracted, so no index was built
    #[error("No documents: {0}")]
    NoDocuments(String),

    /// The persisted index could not be loaded, even after a rebuild
    #[error("Index load error: {0}")]
    IndexLoad(String),

    /// Index storage and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Shorthand for an [`AppError::Extraction`].
    pub fn extraction(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Extraction {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Render the error as a sentence suitable for an end user.
    ///
    /// Every fatal path in the pipeline ends in an `AppError`; this keeps the
    /// caller from having to know the taxonomy to display something useful.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NoDocuments(_) => {
                "No supported documents were found to index. Add .txt, .docx or .pdf files to the document source.".to_string()
            }
            AppError::IndexLoad(_) => {
                "The document index could not be loaded, even after rebuilding it. Try 'convopilot clean' and index again.".to_string()
            }
            AppError::Embedding(_) => {
                "The embedding backend is unavailable. Check that it is running and configured.".to_string()
            }
            AppError::Config(msg) => format!("Configuration problem: {}", msg),
            _ => FALLBACK_MESSAGE.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
