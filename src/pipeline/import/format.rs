use serde::{Deserialize, Serialize};

/// Archive containers we can expand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

/// Broad input categories, resolved once from the file name.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Archive(ArchiveFormat),
    TextLike,
    Spreadsheet,
    Document,
    Media,
    Unknown,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Archive(_) => "archive",
            Self::TextLike => "text_like",
            Self::Spreadsheet => "spreadsheet",
            Self::Document => "document",
            Self::Media => "media",
            Self::Unknown => "unknown",
        }
    }

    /// Classify a file name by its lower-cased extension.
    pub fn classify(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            return Self::Archive(ArchiveFormat::TarGz);
        }

        match extension(name).as_deref() {
            Some("zip") => Self::Archive(ArchiveFormat::Zip),
            Some("tar") => Self::Archive(ArchiveFormat::Tar),
            Some(ext) if TEXT_EXTENSIONS.contains(&ext) => Self::TextLike,
            Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext) => Self::Spreadsheet,
            Some("pdf") => Self::Document,
            Some(ext) if MEDIA_EXTENSIONS.contains(&ext) => Self::Media,
            _ => Self::Unknown,
        }
    }
}

/// Plain text, source code, markup and config formats.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "csv", "log", "json", "xml", "yaml", "yml", "toml", "ini", "cfg", "conf",
    "env", "html", "htm", "css", "scss", "py", "js", "jsx", "ts", "tsx", "vue", "svelte",
    "java", "kt", "swift", "c", "h", "cpp", "hpp", "rs", "go", "rb", "php", "sql", "sh",
];

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Audio/video sent to the backend's asset store instead of being read locally.
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "m4a", "aac", "flac", "ogg", "mp4", "mov", "avi", "webm",
];

/// Lower-cased extension after the last dot, if the name has one.
///
/// Only the final path component is considered, so `dir.v2/Makefile`
/// has no extension.
pub fn extension(name: &str) -> Option<String> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// MIME type guessed from the file name, used as an upload hint.
pub fn guess_mime(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
