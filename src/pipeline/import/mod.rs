pub mod archive;
pub mod format;
pub mod junk;

pub use archive::*;
pub use format::*;
pub use junk::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Not a readable archive container: {0}")]
    InvalidContainer(String),
}

/// One named artifact as handed over by the ingestion boundary.
///
/// The kind is resolved from the name once, here, and carried with the bytes
/// so routing never re-inspects the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    pub name: String,
    pub bytes: Vec<u8>,
    pub kind: InputKind,
}

impl RawInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let kind = InputKind::classify(&name);
        Self { name, bytes, kind }
    }

    /// Override the classification (e.g. a caller that knows better than the name).
    pub fn with_kind(mut self, kind: InputKind) -> Self {
        self.kind = kind;
        self
    }

    /// Read a file from disk, keeping only its file name.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("input")
            .to_string();
        Ok(Self::new(name, bytes))
    }
}

impl From<ArchiveEntry> for RawInput {
    fn from(entry: ArchiveEntry) -> Self {
        Self::new(entry.path, entry.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_input_classifies_on_construction() {
        let input = RawInput::new("report.PDF", vec![1, 2, 3]);
        assert_eq!(input.kind, InputKind::Document);
        assert_eq!(input.name, "report.PDF");
    }

    #[test]
    fn kind_can_be_overridden() {
        let input = RawInput::new("blob", vec![]).with_kind(InputKind::TextLike);
        assert_eq!(input.kind, InputKind::TextLike);
    }

    #[test]
    fn archive_entry_becomes_raw_input_with_full_path() {
        let entry = ArchiveEntry {
            path: "src/lib.rs".into(),
            bytes: b"fn main() {}".to_vec(),
        };
        let input = RawInput::from(entry);
        assert_eq!(input.name, "src/lib.rs");
        assert_eq!(input.kind, InputKind::TextLike);
    }

    #[test]
    fn from_path_reads_bytes_and_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.log");
        std::fs::write(&path, "panic at line 3").unwrap();

        let input = RawInput::from_path(&path).unwrap();
        assert_eq!(input.name, "trace.log");
        assert_eq!(input.bytes, b"panic at line 3");
        assert_eq!(input.kind, InputKind::TextLike);
    }

    #[test]
    fn from_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RawInput::from_path(&dir.path().join("absent.txt")).is_err());
    }
}
