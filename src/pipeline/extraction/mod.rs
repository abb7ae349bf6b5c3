pub mod types;
pub mod text;
pub mod spreadsheet;
pub mod pdf;
pub mod orchestrator;

pub use types::*;
pub use text::*;
pub use spreadsheet::*;
pub use pdf::*;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Spreadsheet parsing failed: {0}")]
    SpreadsheetParsing(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF parser panicked (likely malformed fonts or encoding)")]
    PdfPanicked,

    #[error("Entry too large: {size_mb:.1}MB exceeds {max_mb:.1}MB limit")]
    TooLarge { size_mb: f64, max_mb: f64 },
}
