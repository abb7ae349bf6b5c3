use serde::{Deserialize, Serialize};

/// Delimiter line that opens every extracted block.
pub fn file_header(name: &str) -> String {
    format!("--- FILE: {name} ---")
}

/// Text extracted from one non-media artifact, header included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub origin: String,
    pub text: String,
}

impl ContentBlock {
    /// Prefix `body` with the file header for `origin`.
    pub fn with_header(origin: &str, body: &str) -> Self {
        Self {
            origin: origin.to_string(),
            text: format!("{}\n{}", file_header(origin), body),
        }
    }
}

/// Inline diagnostic substituted for a block whose extraction failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub origin: String,
    pub message: String,
}

impl ExtractionFailure {
    pub fn new(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            message: message.into(),
        }
    }

    /// Visible text so both the model and the human see what failed.
    pub fn render(&self) -> String {
        format!("[ERROR READING {}: {}]", self.origin, self.message)
    }
}

/// Outcome of extracting one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Block(ContentBlock),
    Failed(ExtractionFailure),
    /// Format we cannot render as text. Not an error.
    Skipped,
}

impl ExtractionOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    pub fn block(&self) -> Option<&ContentBlock> {
        match self {
            Self::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ExtractionFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// PDF text extraction abstraction (allows mocking for tests)
pub trait PdfExtractor: Send + Sync {
    /// Text of each page, in page order.
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, super::ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_header_is_first_line() {
        let block = ContentBlock::with_header("src/main.rs", "fn main() {}");
        assert_eq!(block.text.lines().next(), Some("--- FILE: src/main.rs ---"));
        assert!(block.text.ends_with("fn main() {}"));
        assert_eq!(block.origin, "src/main.rs");
    }

    #[test]
    fn failure_renders_origin_and_message() {
        let failure = ExtractionFailure::new("budget.xlsx", "corrupt workbook");
        assert_eq!(failure.render(), "[ERROR READING budget.xlsx: corrupt workbook]");
    }

    #[test]
    fn outcome_accessors() {
        let block = ExtractionOutcome::Block(ContentBlock::with_header("a.txt", "x"));
        assert!(block.block().is_some());
        assert!(block.failure().is_none());
        assert!(ExtractionOutcome::Skipped.is_skipped());
        assert!(!block.is_skipped());
    }
}
