//! Per-type content extraction.
//!
//! One handler per `InputKind`. Every failure inside a handler is converted
//! into an `ExtractionFailure` carrying the artifact name, so a bad file never
//! stops the batch. Kinds with no text handler are `Skipped`.

use super::pdf::{join_pages, PdfTextExtractor};
use super::spreadsheet::{render_workbook, DATA_SUMMARY_MARKER};
use super::text::decode_lossy;
use super::types::{ContentBlock, ExtractionFailure, ExtractionOutcome, PdfExtractor};
use super::ExtractionError;
use crate::pipeline::import::{InputKind, RawInput};

/// Dispatches artifacts to the text, spreadsheet and PDF handlers.
pub struct ContentExtractor {
    pdf: Box<dyn PdfExtractor>,
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self {
            pdf: Box::new(PdfTextExtractor),
        }
    }

    /// Use a specific PDF backend (tests, alternative engines).
    pub fn with_pdf_extractor(pdf: Box<dyn PdfExtractor>) -> Self {
        Self { pdf }
    }

    /// Extract a named artifact, classifying it from its name.
    pub fn extract(&self, name: &str, bytes: &[u8]) -> ExtractionOutcome {
        self.extract_kind(InputKind::classify(name), name, bytes)
    }

    /// Extract an artifact whose kind was already resolved at ingestion.
    pub fn extract_input(&self, input: &RawInput) -> ExtractionOutcome {
        self.extract_kind(input.kind, &input.name, &input.bytes)
    }

    pub fn extract_kind(&self, kind: InputKind, name: &str, bytes: &[u8]) -> ExtractionOutcome {
        let result = match kind {
            InputKind::TextLike => Ok(self.extract_text(name, bytes)),
            InputKind::Spreadsheet => self.extract_spreadsheet(name, bytes),
            InputKind::Document => self.extract_document(name, bytes),
            InputKind::Archive(_) => {
                // One-level contract: archives inside archives stay opaque
                tracing::warn!(origin = %name, "Nested archive not expanded");
                return ExtractionOutcome::Skipped;
            }
            InputKind::Media | InputKind::Unknown => {
                tracing::debug!(origin = %name, kind = kind.as_str(), "No text handler, skipping");
                return ExtractionOutcome::Skipped;
            }
        };

        match result {
            Ok(block) => {
                tracing::debug!(
                    origin = %name,
                    kind = kind.as_str(),
                    text_length = block.text.len(),
                    "Extraction complete"
                );
                ExtractionOutcome::Block(block)
            }
            Err(e) => {
                tracing::warn!(origin = %name, kind = kind.as_str(), error = %e, "Extraction failed");
                ExtractionOutcome::Failed(ExtractionFailure::new(name, e.to_string()))
            }
        }
    }

    fn extract_text(&self, name: &str, bytes: &[u8]) -> ContentBlock {
        ContentBlock::with_header(name, &decode_lossy(bytes))
    }

    fn extract_spreadsheet(&self, name: &str, bytes: &[u8]) -> Result<ContentBlock, ExtractionError> {
        let tables = render_workbook(bytes)?;
        Ok(ContentBlock::with_header(
            name,
            &format!("{DATA_SUMMARY_MARKER}\n{tables}"),
        ))
    }

    fn extract_document(&self, name: &str, bytes: &[u8]) -> Result<ContentBlock, ExtractionError> {
        let pages = self.pdf.extract_pages(bytes)?;
        tracing::debug!(origin = %name, pages = pages.len(), "PDF pages extracted");
        Ok(ContentBlock::with_header(name, &join_pages(&pages)))
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert an extraction error into the inline failure for `origin`.
pub fn failure_from(origin: &str, error: &ExtractionError) -> ExtractionFailure {
    ExtractionFailure::new(origin, error.to_string())
}
