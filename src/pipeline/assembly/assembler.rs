//! Ordered payload assembly.
//!
//! Routes every input to the archive expander, the content extractor or the
//! media uploader, in caller order, and collects the results into one
//! payload. Per-input failures become inline failure elements; only
//! cancellation stops the run.

use super::payload::{Mode, Payload, PayloadElement};
use super::prompt::instructions;
use super::AssemblyError;
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::extraction::{
    failure_from, ContentExtractor, ExtractionError, ExtractionFailure, ExtractionOutcome,
};
use crate::pipeline::import::{expand_as, ArchiveFormat, EntryRead, InputKind, RawInput};
use crate::pipeline::media::{MediaHandle, MediaState, MediaUploader, UploadError};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Caller-imposed limits for one assembly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Largest artifact handed to the extractor. `None` disables the check.
    pub max_entry_bytes: Option<usize>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_entry_bytes: Some(100 * 1024 * 1024),
        }
    }
}

/// What happened to each input, without parsing payload text.
#[derive(Debug, Clone, Default)]
pub struct AssemblyReport {
    /// Content blocks appended.
    pub blocks: usize,
    /// Inline failures appended, in payload order.
    pub failures: Vec<ExtractionFailure>,
    /// Names that produced no element (unsupported formats, nested archives).
    pub skipped: Vec<String>,
    /// Archive entries dropped as junk.
    pub junk_filtered: usize,
    /// Every media item that reached the remote store, READY or FAILED.
    pub media: Vec<MediaHandle>,
}

#[derive(Debug, Clone)]
pub struct Assembly {
    pub payload: Payload,
    pub report: AssemblyReport,
}

impl Assembly {
    fn new() -> Self {
        Self {
            payload: Payload::new(),
            report: AssemblyReport::default(),
        }
    }

    fn push_failure(&mut self, failure: ExtractionFailure) {
        self.payload.push(PayloadElement::Failure(failure.clone()));
        self.report.failures.push(failure);
    }
}

/// Builds the ordered payload for one request.
pub struct PayloadAssembler {
    extractor: ContentExtractor,
    /// `None` assembles without touching the remote store; media is skipped.
    uploader: Option<MediaUploader>,
    config: AssemblerConfig,
    cancel: CancelFlag,
}

impl PayloadAssembler {
    pub fn new(uploader: Option<MediaUploader>, cancel: CancelFlag) -> Self {
        Self {
            extractor: ContentExtractor::new(),
            uploader,
            config: AssemblerConfig::default(),
            cancel,
        }
    }

    pub fn with_config(mut self, config: AssemblerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Assemble instructions, the optional paste and every input, in that order.
    pub fn assemble(
        &self,
        mode: Mode,
        pasted_text: Option<&str>,
        inputs: Vec<RawInput>,
    ) -> Result<Assembly, AssemblyError> {
        let mut assembly = Assembly::new();
        assembly
            .payload
            .push(PayloadElement::Instructions(instructions(mode)));

        if let Some(text) = pasted_text.filter(|t| !t.is_empty()) {
            assembly
                .payload
                .push(PayloadElement::ManualPaste(text.to_string()));
        }

        let input_count = inputs.len();
        for input in inputs {
            self.check_cancelled()?;
            tracing::debug!(input = %input.name, kind = input.kind.as_str(), "Routing input");

            match input.kind {
                InputKind::Archive(format) => {
                    self.push_archive(format, &input, &mut assembly)?
                }
                InputKind::Media => self.push_media(&input, &mut assembly)?,
                kind => self.push_extracted(kind, &input.name, &input.bytes, &mut assembly),
            }
        }

        tracing::info!(
            mode = %mode,
            inputs = input_count,
            elements = assembly.payload.len(),
            blocks = assembly.report.blocks,
            failures = assembly.report.failures.len(),
            skipped = assembly.report.skipped.len(),
            junk_filtered = assembly.report.junk_filtered,
            "Payload assembled"
        );

        Ok(assembly)
    }

    fn check_cancelled(&self) -> Result<(), AssemblyError> {
        if self.cancel.is_cancelled() {
            tracing::info!("Assembly cancelled");
            return Err(AssemblyError::Cancelled);
        }
        Ok(())
    }

    fn push_archive(
        &self,
        format: ArchiveFormat,
        input: &RawInput,
        assembly: &mut Assembly,
    ) -> Result<(), AssemblyError> {
        let expansion = match expand_as(format, &input.bytes) {
            Ok(expansion) => expansion,
            Err(e) => {
                tracing::warn!(archive = %input.name, error = %e, "Archive could not be opened");
                assembly.push_failure(ExtractionFailure::new(&input.name, e.to_string()));
                return Ok(());
            }
        };

        tracing::info!(
            archive = %input.name,
            entries = expansion.entries.len(),
            junk_filtered = expansion.junk_filtered,
            "Archive expanded"
        );
        assembly.report.junk_filtered += expansion.junk_filtered;

        for entry in expansion.entries {
            self.check_cancelled()?;
            match entry {
                EntryRead::Entry(entry) => {
                    let kind = InputKind::classify(&entry.path);
                    self.push_extracted(kind, &entry.path, &entry.bytes, assembly);
                }
                EntryRead::Unreadable { path, message } => {
                    assembly.push_failure(ExtractionFailure::new(path, message));
                }
            }
        }
        Ok(())
    }

    fn push_media(&self, input: &RawInput, assembly: &mut Assembly) -> Result<(), AssemblyError> {
        let Some(uploader) = &self.uploader else {
            tracing::info!(media = %input.name, "No media store configured, media not uploaded");
            assembly.report.skipped.push(input.name.clone());
            return Ok(());
        };

        match uploader.upload(&input.name, &input.bytes, None) {
            Ok(handle) => {
                match handle.reference() {
                    Some(reference) => {
                        assembly.payload.push(PayloadElement::Media(reference));
                        assembly
                            .payload
                            .push(PayloadElement::MediaMarker(input.name.clone()));
                    }
                    None if handle.state() == MediaState::Ready => {
                        tracing::warn!(media = %input.name, "Media ready but no file URI returned");
                        assembly.push_failure(ExtractionFailure::new(
                            &input.name,
                            "media is ready but the store returned no file URI",
                        ));
                    }
                    None => {
                        let reason = handle
                            .failure
                            .clone()
                            .unwrap_or_else(|| format!("media ended in state {}", handle.state()));
                        assembly.push_failure(ExtractionFailure::new(
                            &input.name,
                            format!("remote processing failed: {reason}"),
                        ));
                    }
                }
                assembly.report.media.push(handle);
                Ok(())
            }
            Err(UploadError::Cancelled) => Err(AssemblyError::Cancelled),
            Err(e) => {
                tracing::warn!(media = %input.name, error = %e, "Media upload failed");
                assembly.push_failure(ExtractionFailure::new(&input.name, e.to_string()));
                Ok(())
            }
        }
    }

    fn push_extracted(&self, kind: InputKind, name: &str, bytes: &[u8], assembly: &mut Assembly) {
        if let Some(max) = self.config.max_entry_bytes {
            if bytes.len() > max {
                let error = ExtractionError::TooLarge {
                    size_mb: bytes.len() as f64 / BYTES_PER_MB,
                    max_mb: max as f64 / BYTES_PER_MB,
                };
                tracing::warn!(origin = %name, size_bytes = bytes.len(), "Entry over size cap");
                assembly.push_failure(failure_from(name, &error));
                return;
            }
        }

        match self.extractor.extract_kind(kind, name, bytes) {
            ExtractionOutcome::Block(block) => {
                assembly.report.blocks += 1;
                assembly.payload.push(PayloadElement::Content(block));
            }
            ExtractionOutcome::Failed(failure) => assembly.push_failure(failure),
            ExtractionOutcome::Skipped => assembly.report.skipped.push(name.to_string()),
        }
    }
}
