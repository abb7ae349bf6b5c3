//! Distillation orchestrator.
//!
//! Single entry point that drives one request end to end:
//! assemble (expand → extract → upload) → invoke the model → summary.
//!
//! Backends are injected as traits so the whole flow runs against
//! `MockBackend` in tests.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::DistillerConfig;
use crate::pipeline::assembly::{AssemblyError, AssemblyReport, Mode, Payload, PayloadAssembler};
use crate::pipeline::backend::{BackendError, GeminiClient, GenerativeBackend, MediaStore};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::import::RawInput;
use crate::pipeline::media::MediaUploader;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DistillError {
    #[error("Assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// Everything the ingestion boundary hands over for one distillation.
#[derive(Debug, Clone, Default)]
pub struct DistillRequest {
    pub mode: Mode,
    pub pasted_text: Option<String>,
    pub inputs: Vec<RawInput>,
}

/// Counters shown to the user next to the summary.
#[derive(Debug, Clone, Serialize)]
pub struct DistillStats {
    pub blocks: usize,
    pub failures: usize,
    pub skipped: usize,
    pub junk_filtered: usize,
    pub media: usize,
}

impl From<&AssemblyReport> for DistillStats {
    fn from(report: &AssemblyReport) -> Self {
        Self {
            blocks: report.blocks,
            failures: report.failures.len(),
            skipped: report.skipped.len(),
            junk_filtered: report.junk_filtered,
            media: report.media.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistillOutput {
    pub request_id: Uuid,
    /// Model output, returned as-is.
    pub summary: String,
    pub report: AssemblyReport,
}

// ---------------------------------------------------------------------------
// Invoker
// ---------------------------------------------------------------------------

/// Sends an assembled payload to the model in a single call.
///
/// No retry here (the client owns that) and no validation of the answer.
pub struct DistillationInvoker {
    backend: Arc<dyn GenerativeBackend>,
}

impl DistillationInvoker {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    pub fn invoke(&self, payload: &Payload) -> Result<String, BackendError> {
        tracing::info!(
            elements = payload.len(),
            text_bytes = payload.texts().iter().map(String::len).sum::<usize>(),
            "Invoking distillation"
        );
        let result = self.backend.generate(payload);
        match &result {
            Ok(summary) => tracing::info!(summary_length = summary.len(), "Distillation complete"),
            Err(e) => tracing::error!(error = %e, "Distillation failed"),
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs assembly and invocation as one call.
pub struct Distiller {
    assembler: PayloadAssembler,
    invoker: DistillationInvoker,
}

impl Distiller {
    pub fn new(assembler: PayloadAssembler, invoker: DistillationInvoker) -> Self {
        Self { assembler, invoker }
    }

    pub fn distill(&self, request: DistillRequest) -> Result<DistillOutput, DistillError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("distill", request_id = %request_id, mode = %request.mode);
        let _enter = span.enter();

        tracing::info!(
            inputs = request.inputs.len(),
            has_paste = request.pasted_text.is_some(),
            "Distillation started"
        );

        let assembly = self.assembler.assemble(
            request.mode,
            request.pasted_text.as_deref(),
            request.inputs,
        )?;
        let summary = self.invoker.invoke(&assembly.payload)?;

        Ok(DistillOutput {
            request_id,
            summary,
            report: assembly.report,
        })
    }
}

/// Wire a `Distiller` to the Gemini service described by `config`.
pub fn build_distiller(config: &DistillerConfig, cancel: CancelFlag) -> Result<Distiller, BackendError> {
    let client = Arc::new(GeminiClient::new(config)?);
    tracing::info!(model = %client.model(), "Using Gemini backend");

    let store: Arc<dyn MediaStore> = client.clone();
    let uploader = MediaUploader::new(store, config.poll, cancel.clone());
    let assembler = PayloadAssembler::new(Some(uploader), cancel);

    Ok(Distiller::new(assembler, DistillationInvoker::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PollPolicy;
    use crate::pipeline::assembly::PayloadElement;
    use crate::pipeline::backend::MockBackend;
    use crate::pipeline::import::archive::make_zip;
    use std::time::Duration;

    fn build_test_distiller(mock: &Arc<MockBackend>, cancel: CancelFlag) -> Distiller {
        let store: Arc<dyn MediaStore> = mock.clone();
        let backend: Arc<dyn GenerativeBackend> = mock.clone();
        let poll = PollPolicy {
            interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        };
        let uploader = MediaUploader::new(store, poll, cancel.clone());
        Distiller::new(
            PayloadAssembler::new(Some(uploader), cancel),
            DistillationInvoker::new(backend),
        )
    }

    #[test]
    fn zip_with_junk_end_to_end() {
        let mock = Arc::new(MockBackend::new("# SYSTEM INJECTION\nProject: demo"));
        let distiller = build_test_distiller(&mock, CancelFlag::new());
        let zip = make_zip(&[
            ("main.py", b"print(1)"),
            ("node_modules/x.js", b"module.exports = {}"),
        ]);

        let output = distiller
            .distill(DistillRequest {
                mode: Mode::Handoff,
                pasted_text: Some("fix bug".into()),
                inputs: vec![RawInput::new("project.zip", zip)],
            })
            .unwrap();

        assert_eq!(output.summary, "# SYSTEM INJECTION\nProject: demo");

        let payloads = mock.payloads();
        assert_eq!(payloads.len(), 1);
        let elements = payloads[0].elements();
        assert_eq!(elements.len(), 3);
        assert!(matches!(
            &elements[0],
            PayloadElement::Instructions(text) if text.contains("Full Project Handoff (Resume Work)")
        ));
        assert_eq!(elements[1], PayloadElement::ManualPaste("fix bug".into()));
        assert_eq!(elements[1].text().unwrap(), "--- MANUAL PASTE ---\nfix bug");
        match &elements[2] {
            PayloadElement::Content(block) => {
                assert_eq!(block.text, "--- FILE: main.py ---\nprint(1)");
            }
            other => panic!("expected content block, got {other:?}"),
        }
        assert_eq!(output.report.junk_filtered, 1);
    }

    #[test]
    fn summary_is_returned_unvalidated() {
        let mock = Arc::new(MockBackend::new(""));
        let distiller = build_test_distiller(&mock, CancelFlag::new());
        let output = distiller.distill(DistillRequest::default()).unwrap();
        assert_eq!(output.summary, "");
    }

    #[test]
    fn backend_error_passes_through_verbatim() {
        let message = "API key not valid. Please pass a valid API key.";
        let mock = Arc::new(
            MockBackend::new("unused")
                .with_generate_error(BackendError::Authentication(message.into())),
        );
        let distiller = build_test_distiller(&mock, CancelFlag::new());

        let err = distiller.distill(DistillRequest::default()).unwrap_err();
        match err {
            DistillError::Backend(BackendError::Authentication(msg)) => assert_eq!(msg, message),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invoker_makes_exactly_one_call() {
        let mock = Arc::new(
            MockBackend::new("unused").with_generate_error(BackendError::Api {
                status: 503,
                message: "overloaded".into(),
            }),
        );
        let invoker = DistillationInvoker::new(mock.clone());
        assert!(invoker.invoke(&Payload::new()).is_err());
        assert_eq!(mock.payloads().len(), 1);
    }

    #[test]
    fn cancellation_skips_generate() {
        let mock = Arc::new(MockBackend::new("unused"));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let distiller = build_test_distiller(&mock, cancel);

        let err = distiller
            .distill(DistillRequest {
                inputs: vec![RawInput::new("a.txt", b"x".to_vec())],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DistillError::Assembly(AssemblyError::Cancelled)));
        assert!(mock.payloads().is_empty());
    }

    #[test]
    fn paste_media_and_files_reach_backend_in_order() {
        let mock = Arc::new(MockBackend::new("ok"));
        let distiller = build_test_distiller(&mock, CancelFlag::new());

        let output = distiller
            .distill(DistillRequest {
                mode: Mode::Debug,
                pasted_text: Some("error: borrow of moved value".into()),
                inputs: vec![
                    RawInput::new("repro.mp4", vec![0; 16]),
                    RawInput::new("lib.rs", b"fn main() {}".to_vec()),
                ],
            })
            .unwrap();

        let payload = &mock.payloads()[0];
        let kinds: Vec<&str> = payload
            .elements()
            .iter()
            .map(|e| match e {
                PayloadElement::Instructions(_) => "instructions",
                PayloadElement::ManualPaste(_) => "paste",
                PayloadElement::Media(_) => "media",
                PayloadElement::MediaMarker(_) => "marker",
                PayloadElement::Content(_) => "content",
                PayloadElement::Failure(_) => "failure",
            })
            .collect();
        assert_eq!(kinds, vec!["instructions", "paste", "media", "marker", "content"]);

        let stats = DistillStats::from(&output.report);
        assert_eq!(stats.media, 1);
        assert_eq!(stats.blocks, 1);
    }

    #[test]
    fn build_distiller_from_config() {
        let config = DistillerConfig::new("test-key");
        assert!(build_distiller(&config, CancelFlag::new()).is_ok());
    }
}
