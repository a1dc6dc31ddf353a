//! Text extraction from uploaded documents.

use std::sync::Arc;

use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    #[error("the uploaded file is not a PDF")]
    NotPdf,
    #[error("could not read PDF: {0}")]
    Unreadable(String),
    #[error("PDF extraction failed unexpectedly")]
    Crashed,
}

/// Turns document bytes into plain text.
pub trait TextExtractor: Send + Sync {
    /// # Errors
    ///
    /// Returns `ExtractError` if the bytes cannot be read as a document.
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// `pdf-extract` backed extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        if !is_pdf(bytes) {
            return Err(ExtractError::NotPdf);
        }
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Unreadable(e.to_string()))
    }
}

#[must_use]
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Run extraction on the blocking pool; a panicking parser becomes
/// `ExtractError::Crashed` instead of taking the worker down.
///
/// # Errors
///
/// Returns the extractor's error, or `ExtractError::Crashed`.
pub async fn extract_blocking(
    extractor: Arc<dyn TextExtractor>,
    bytes: Vec<u8>,
) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
        .await
        .map_err(|_| ExtractError::Crashed)?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panicking;

    impl TextExtractor for Panicking {
        fn extract_text(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
            panic!("malformed xref table");
        }
    }

    #[test]
    fn non_pdf_bytes_are_rejected() {
        let err = PdfTextExtractor.extract_text(b"hello world").unwrap_err();
        assert!(matches!(err, ExtractError::NotPdf));
        assert!(is_pdf(b"%PDF-1.7\n..."));
    }

    #[tokio::test]
    async fn panicking_extractor_is_contained() {
        let err = extract_blocking(Arc::new(Panicking), b"%PDF-1.4".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Crashed));
    }
}
