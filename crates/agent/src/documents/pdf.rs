//! PDF text extraction using the `pdf-extract` crate.
//!
//! Handles digital PDFs with embedded text layers. Scanned PDFs yield blank
//! text, which the pipeline reports as an extraction failure.

use asika_core::error::ExtractionError;

use super::TextExtractor;

pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::ExtractionFailure {
            family: "pdf".into(),
            reason: e.to_string(),
        })
    }
}
