//! One-level archive expansion.
//!
//! Entries are emitted in the container's own traversal order: that order is
//! the only recency signal the downstream model gets, so it is never sorted.
//! Directory markers and junk paths are dropped. Nested archives come out as
//! plain entries and are not expanded again.

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;

use super::format::ArchiveFormat;
use super::junk::is_junk;
use super::ArchiveError;

/// A file extracted from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// One position in the container: either readable bytes or a per-entry failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRead {
    Entry(ArchiveEntry),
    Unreadable { path: String, message: String },
}

impl EntryRead {
    pub fn path(&self) -> &str {
        match self {
            Self::Entry(entry) => &entry.path,
            Self::Unreadable { path, .. } => path,
        }
    }
}

/// Result of expanding one container.
#[derive(Debug, Clone, Default)]
pub struct ArchiveExpansion {
    pub entries: Vec<EntryRead>,
    /// Entries dropped by the junk filter.
    pub junk_filtered: usize,
}

/// Expand a zip container.
pub fn expand(bytes: &[u8]) -> Result<ArchiveExpansion, ArchiveError> {
    expand_as(ArchiveFormat::Zip, bytes)
}

/// Expand a container of the given format.
pub fn expand_as(format: ArchiveFormat, bytes: &[u8]) -> Result<ArchiveExpansion, ArchiveError> {
    match format {
        ArchiveFormat::Zip => expand_zip(bytes),
        ArchiveFormat::Tar => expand_tar(bytes),
        ArchiveFormat::TarGz => expand_tar(GzDecoder::new(bytes)),
    }
}

fn expand_zip(bytes: &[u8]) -> Result<ArchiveExpansion, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ArchiveError::InvalidContainer(e.to_string()))?;

    let mut expansion = ArchiveExpansion::default();

    for index in 0..archive.len() {
        let listed_name = archive.name_for_index(index).map(str::to_string);
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                // Encrypted or unsupported compression: name is still known
                let path = listed_name.unwrap_or_else(|| format!("entry #{index}"));
                if path.ends_with('/') {
                    continue;
                }
                if is_junk(&path) {
                    expansion.junk_filtered += 1;
                    continue;
                }
                tracing::warn!(path = %path, error = %e, "Archive entry unreadable");
                expansion.entries.push(EntryRead::Unreadable {
                    path,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let path = file.name().to_string();
        if file.is_dir() {
            continue;
        }
        if is_junk(&path) {
            expansion.junk_filtered += 1;
            continue;
        }

        let mut content = Vec::with_capacity(file.size().min(64 * 1024 * 1024) as usize);
        match file.read_to_end(&mut content) {
            Ok(_) => expansion.entries.push(EntryRead::Entry(ArchiveEntry {
                path,
                bytes: content,
            })),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Archive entry failed to decompress");
                expansion.entries.push(EntryRead::Unreadable {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    tracing::debug!(
        entries = expansion.entries.len(),
        junk_filtered = expansion.junk_filtered,
        "Zip archive expanded"
    );

    Ok(expansion)
}

fn expand_tar<R: Read>(reader: R) -> Result<ArchiveExpansion, ArchiveError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| ArchiveError::InvalidContainer(e.to_string()))?;

    let mut expansion = ArchiveExpansion::default();
    let mut saw_entry = false;

    for entry in entries {
        // A broken header means the rest of the stream cannot be located
        let mut entry = match entry {
            Ok(entry) => entry,
            Err(e) if !saw_entry => return Err(ArchiveError::InvalidContainer(e.to_string())),
            Err(e) => {
                tracing::warn!(error = %e, "Tar stream truncated, keeping entries read so far");
                break;
            }
        };
        saw_entry = true;

        let entry_type = entry.header().entry_type();
        if !entry_type.is_file() {
            continue;
        }

        let path = match entry.path() {
            Ok(p) => p.to_string_lossy().into_owned(),
            Err(e) => {
                expansion.entries.push(EntryRead::Unreadable {
                    path: "<invalid path>".to_string(),
                    message: e.to_string(),
                });
                continue;
            }
        };
        if is_junk(&path) {
            expansion.junk_filtered += 1;
            continue;
        }

        let mut content = Vec::new();
        match entry.read_to_end(&mut content) {
            Ok(_) => expansion.entries.push(EntryRead::Entry(ArchiveEntry {
                path,
                bytes: content,
            })),
            Err(e) => expansion.entries.push(EntryRead::Unreadable {
                path,
                message: e.to_string(),
            }),
        }
    }

    tracing::debug!(
        entries = expansion.entries.len(),
        junk_filtered = expansion.junk_filtered,
        "Tar archive expanded"
    );

    Ok(expansion)
}

/// Build zip bytes in memory. Paths ending in `/` become directory entries.
#[cfg(test)]
pub(crate) fn make_zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default();
        for (path, content) in files {
            if path.ends_with('/') {
                writer.add_directory(*path, options).unwrap();
            } else {
                writer.start_file(*path, options).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap();
    }
    buffer.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry_paths(expansion: &ArchiveExpansion) -> Vec<&str> {
        expansion.entries.iter().map(|e| e.path()).collect()
    }

    fn make_tar(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            if path.ends_with('/') {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_size(0);
            } else {
                header.set_size(content.len() as u64);
            }
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn skips_directories_and_junk() {
        let zip = make_zip(&[
            ("a.txt", b"alpha"),
            ("__MACOSX/b.txt", b"meta"),
            ("dir/", b""),
        ]);
        let expansion = expand(&zip).unwrap();

        assert_eq!(entry_paths(&expansion), vec!["a.txt"]);
        assert_eq!(expansion.junk_filtered, 1);
        match &expansion.entries[0] {
            EntryRead::Entry(entry) => assert_eq!(entry.bytes, b"alpha"),
            other => panic!("expected readable entry, got {other:?}"),
        }
    }

    #[test]
    fn preserves_container_order() {
        let zip = make_zip(&[
            ("z_last_alphabetically.py", b"1"),
            ("a_first.py", b"2"),
            ("m/middle.py", b"3"),
        ]);
        let expansion = expand(&zip).unwrap();
        assert_eq!(
            entry_paths(&expansion),
            vec!["z_last_alphabetically.py", "a_first.py", "m/middle.py"]
        );
    }

    #[test]
    fn nested_archive_is_kept_as_raw_entry() {
        let inner = make_zip(&[("inner.txt", b"hidden")]);
        let outer = make_zip(&[("nested.zip", &inner)]);
        let expansion = expand(&outer).unwrap();

        assert_eq!(entry_paths(&expansion), vec!["nested.zip"]);
        match &expansion.entries[0] {
            EntryRead::Entry(entry) => assert_eq!(entry.bytes, inner),
            other => panic!("expected raw nested archive, got {other:?}"),
        }
    }

    #[test]
    fn invalid_container_is_an_error() {
        let result = expand(b"definitely not a zip file");
        assert!(matches!(result, Err(ArchiveError::InvalidContainer(_))));
    }

    #[test]
    fn empty_archive_yields_no_entries() {
        let zip = make_zip(&[]);
        let expansion = expand(&zip).unwrap();
        assert!(expansion.entries.is_empty());
    }

    #[test]
    fn tar_expansion_filters_and_keeps_order() {
        let tar = make_tar(&[
            ("proj/", b""),
            ("proj/main.py", b"print('hi')"),
            ("proj/node_modules/x.js", b"junk"),
            ("proj/README.md", b"# readme"),
        ]);
        let expansion = expand_as(ArchiveFormat::Tar, &tar).unwrap();
        assert_eq!(entry_paths(&expansion), vec!["proj/main.py", "proj/README.md"]);
        assert_eq!(expansion.junk_filtered, 1);
    }

    #[test]
    fn tar_gz_expansion() {
        let tar = make_tar(&[("notes.txt", b"gzipped")]);
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tar).unwrap();
        let gz = encoder.finish().unwrap();

        let expansion = expand_as(ArchiveFormat::TarGz, &gz).unwrap();
        assert_eq!(entry_paths(&expansion), vec!["notes.txt"]);
    }

    #[test]
    fn garbage_tar_gz_is_an_error() {
        let result = expand_as(ArchiveFormat::TarGz, b"not gzip at all");
        assert!(matches!(result, Err(ArchiveError::InvalidContainer(_))));
    }
}
