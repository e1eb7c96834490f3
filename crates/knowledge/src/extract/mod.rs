//! Text extraction from raw document bytes.
//!
//! Extraction is a pure function of the input bytes. Failures are reported
//! per document as [`AppError::Extraction`] so a batch can skip the document
//! and carry on.

mod docx;
mod pdf;

pub use docx::extract_docx;
pub use pdf::extract_pdf;

use crate::types::{DocumentFormat, ExtractedDocument, RawDocument};
use convopilot_core::{AppError, AppResult};

/// Extract plain text from a raw document.
///
/// Empty input yields an empty string for every format.
pub fn extract(raw: &RawDocument) -> AppResult<String> {
    if raw.content.is_empty() {
        return Ok(String::new());
    }

    let result = match raw.format {
        DocumentFormat::PlainText => extract_plaintext(&raw.content),
        DocumentFormat::Docx => extract_docx(&raw.content),
        DocumentFormat::Pdf => extract_pdf(&raw.content),
    };

    result.map_err(|reason| AppError::extraction(&raw.name, reason))
}

/// Extract every document, keeping the successes and the per-document failures.
pub fn extract_all(raws: &[RawDocument]) -> (Vec<ExtractedDocument>, Vec<AppError>) {
    let mut extracted = Vec::with_capacity(raws.len());
    let mut failures = Vec::new();

    for raw in raws {
        match extract(raw) {
            Ok(text) => {
                tracing::debug!(
                    "Extracted {} chars from '{}' ({})",
                    text.chars().count(),
                    raw.name,
                    raw.format.as_str()
                );
                extracted.push(ExtractedDocument::new(&raw.name, &text));
            }
            Err(e) => {
                tracing::warn!("Skipping document: {}", e);
                failures.push(e);
            }
        }
    }

    (extracted, failures)
}

fn extract_plaintext(bytes: &[u8]) -> Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| format!("not valid UTF-8: {}", e))
}
