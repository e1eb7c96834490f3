//! PDF text extraction via `pdf-extract`.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Extract the text of every page, in page order, joined by newline.
///
/// Leading and trailing whitespace the extractor emits around each page is
/// trimmed. A page without a text layer contributes an empty line.
pub fn extract_pdf(bytes: &[u8]) -> Result<String, String> {
    if bytes.is_empty() {
        return Ok(String::new());
    }

    // pdf-extract panics on some malformed inputs instead of returning an error.
    let pages = catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| "PDF extraction failed: parser panicked on malformed input".to_string())?
    .map_err(|e| format!("PDF extraction failed: {}", e))?;

    tracing::debug!("Extracted {} PDF pages", pages.len());

    Ok(pages
        .iter()
        .map(|page| page.trim())
        .collect::<Vec<_>>()
        .join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::pdf_with_pages;

    #[test]
    fn test_empty_pdf_bytes() {
        assert_eq!(extract_pdf(&[]).unwrap(), "");
    }

    #[test]
    fn test_garbage_is_an_error_not_a_panic() {
        let result = extract_pdf(b"%PDF-1.4 this is not really a pdf");
        assert!(result.is_err());
    }

    #[test]
    fn test_pages_joined_by_newline() {
        let bytes = pdf_with_pages(&["Alpha", "Beta"]);
        assert_eq!(extract_pdf(&bytes).unwrap(), "Alpha\nBeta");
    }

    #[test]
    fn test_single_page() {
        let bytes = pdf_with_pages(&["Quarterly audit"]);
        assert_eq!(extract_pdf(&bytes).unwrap(), "Quarterly audit");
    }
}
