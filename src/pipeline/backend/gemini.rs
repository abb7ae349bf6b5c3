use reqwest::blocking::{Client, Response};

use super::gemini_types::*;
use super::retry::with_retry;
use super::types::{GenerativeBackend, MediaStore, RemoteFile, RemoteFileState};
use super::BackendError;
use crate::config::{DistillerConfig, RetryPolicy};
use crate::pipeline::assembly::{Payload, PayloadElement};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Gemini REST client: Files API for media, generateContent for distillation.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
    retry: RetryPolicy,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &DistillerConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
            retry: config.retry,
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Transport(format!("Cannot reach {}: {e}", self.base_url))
        } else if e.is_timeout() {
            BackendError::Transport(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            BackendError::Transport(e.to_string())
        }
    }

    /// Open a resumable upload session and return its upload URL.
    fn start_upload(&self, name: &str, size: usize, mime_type: &str) -> Result<String, BackendError> {
        let url = format!("{}/upload/v1beta/files", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", size.to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&UploadStartRequest {
                file: UploadMetadata { display_name: name },
            })
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let response = check_status(response)?;
        response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                BackendError::ResponseParsing("upload session response has no upload URL".into())
            })
    }

    fn finish_upload(&self, upload_url: &str, bytes: &[u8]) -> Result<RemoteFile, BackendError> {
        let response = self
            .client
            .post(upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes.to_vec())
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let envelope: FileEnvelope = check_status(response)?
            .json()
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))?;

        Ok(remote_file(envelope.file))
    }
}

impl MediaStore for GeminiClient {
    fn upload(&self, name: &str, bytes: &[u8], mime_type: &str) -> Result<RemoteFile, BackendError> {
        with_retry(&self.retry, "upload", || {
            let upload_url = self.start_upload(name, bytes.len(), mime_type)?;
            self.finish_upload(&upload_url, bytes)
        })
    }

    fn status(&self, remote_id: &str) -> Result<RemoteFile, BackendError> {
        let url = format!("{}/v1beta/{}", self.base_url, resource_name(remote_id));

        with_retry(&self.retry, "status", || {
            let response = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .send()
                .map_err(|e| self.map_send_error(e))?;

            let resource: FileResource = check_status(response)?
                .json()
                .map_err(|e| BackendError::ResponseParsing(e.to_string()))?;

            Ok(remote_file(resource))
        })
    }
}

impl GenerativeBackend for GeminiClient {
    fn generate(&self, payload: &Payload) -> Result<String, BackendError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user".into(),
                parts: payload_parts(payload),
            }],
        };

        tracing::info!(
            model = %self.model,
            parts = body.contents[0].parts.len(),
            "Sending generate request"
        );

        let parsed: GenerateContentResponse = with_retry(&self.retry, "generate", || {
            let response = self
                .client
                .post(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .json(&body)
                .send()
                .map_err(|e| self.map_send_error(e))?;

            check_status(response)?
                .json()
                .map_err(|e| BackendError::ResponseParsing(e.to_string()))
        })?;

        response_text(parsed)
    }
}

// ═══════════════════════════════════════════════════════════
// Wire helpers
// ═══════════════════════════════════════════════════════════

fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(classify_status(status.as_u16(), &body))
}

/// Map an HTTP error status and body to a `BackendError`.
pub fn classify_status(status: u16, body: &str) -> BackendError {
    let (message, api_status) = error_details(body);
    tracing::warn!(
        http_status = status,
        api_status = api_status.as_deref().unwrap_or("unknown"),
        "Backend rejected request"
    );
    match status {
        401 | 403 => BackendError::Authentication(message),
        429 => BackendError::Quota(message),
        400 | 413 => BackendError::MalformedPayload(message),
        _ => BackendError::Api { status, message },
    }
}

/// The service's own error message, or the raw body when it is not JSON.
pub fn error_message(body: &str) -> String {
    error_details(body).0
}

/// Message plus the service's status code name (e.g. `INVALID_ARGUMENT`).
fn error_details(body: &str) -> (String, Option<String>) {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => {
            (envelope.error.message, envelope.error.status)
        }
        _ if body.trim().is_empty() => ("empty error body".to_string(), None),
        _ => (body.trim().to_string(), None),
    }
}

/// Convert payload elements into request parts, preserving order.
pub fn payload_parts(payload: &Payload) -> Vec<RequestPart> {
    payload
        .elements()
        .iter()
        .map(|element| match element {
            PayloadElement::Media(reference) => RequestPart::File {
                file_data: FileData {
                    mime_type: reference.mime_type.clone(),
                    file_uri: reference.uri.clone(),
                },
            },
            other => RequestPart::Text {
                text: other.text().unwrap_or_default(),
            },
        })
        .collect()
}

/// Concatenated text of the first candidate.
pub fn response_text(response: GenerateContentResponse) -> Result<String, BackendError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(BackendError::Blocked(reason));
    };

    let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
    if parts.is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(BackendError::Blocked(reason));
    }

    Ok(parts.into_iter().filter_map(|p| p.text).collect::<String>())
}

fn resource_name(remote_id: &str) -> String {
    if remote_id.starts_with("files/") {
        remote_id.to_string()
    } else {
        format!("files/{remote_id}")
    }
}

fn remote_file(resource: FileResource) -> RemoteFile {
    let state = RemoteFileState::from_api(resource.state.as_deref());
    let error = resource
        .error
        .map(|status| status.message)
        .filter(|message| !message.is_empty());

    RemoteFile {
        id: resource.name,
        uri: resource.uri,
        mime_type: resource.mime_type,
        state,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assembly::Mode;
    use crate::pipeline::extraction::ContentBlock;
    use crate::pipeline::media::MediaReference;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn status_codes_classify() {
        assert!(matches!(classify_status(401, ""), BackendError::Authentication(_)));
        assert!(matches!(classify_status(403, ""), BackendError::Authentication(_)));
        assert!(matches!(classify_status(429, ""), BackendError::Quota(_)));
        assert!(matches!(classify_status(400, ""), BackendError::MalformedPayload(_)));
        assert!(matches!(
            classify_status(500, ""),
            BackendError::Api { status: 500, .. }
        ));
        assert!(classify_status(503, "").is_transient());
        assert!(!classify_status(429, "").is_transient());
    }

    #[test]
    fn error_message_is_taken_verbatim_from_body() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            error_message(body),
            "API key not valid. Please pass a valid API key."
        );
        match classify_status(403, body) {
            BackendError::Authentication(msg) => {
                assert_eq!(msg, "API key not valid. Please pass a valid API key.")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn error_details_carry_service_status_name() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        let (message, api_status) = error_details(body);
        assert_eq!(message, "Resource has been exhausted");
        assert_eq!(api_status.as_deref(), Some("RESOURCE_EXHAUSTED"));
        assert_eq!(error_details("plain text").1, None);
    }

    #[test]
    fn non_json_error_body_is_kept() {
        assert_eq!(error_message("  upstream connect error  "), "upstream connect error");
        assert_eq!(error_message(""), "empty error body");
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let response = parse(
            r##"{"candidates":[{"content":{"parts":[{"text":"# Snapshot\n"},{"text":"Next step"}]},"finishReason":"STOP"}]}"##,
        );
        assert_eq!(response_text(response).unwrap(), "# Snapshot\nNext step");
    }

    #[test]
    fn missing_candidates_is_blocked_with_reason() {
        let response = parse(r#"{"promptFeedback":{"blockReason":"OTHER"}}"#);
        assert_eq!(
            response_text(response).unwrap_err(),
            BackendError::Blocked("OTHER".into())
        );
    }

    #[test]
    fn empty_candidate_is_blocked_with_finish_reason() {
        let response = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        assert_eq!(
            response_text(response).unwrap_err(),
            BackendError::Blocked("SAFETY".into())
        );
    }

    #[test]
    fn payload_parts_keep_order_and_reference_media() {
        let mut payload = Payload::new();
        payload.push(PayloadElement::Instructions(crate::pipeline::assembly::instructions(
            Mode::Debug,
        )));
        payload.push(PayloadElement::Content(ContentBlock::with_header("a.py", "x = 1")));
        payload.push(PayloadElement::Media(MediaReference {
            local_name: "call.mp3".into(),
            uri: "https://example.test/files/m1".into(),
            mime_type: "audio/mpeg".into(),
        }));
        payload.push(PayloadElement::MediaMarker("call.mp3".into()));

        let parts = payload_parts(&payload);
        assert_eq!(parts.len(), 4);
        assert!(matches!(&parts[0], RequestPart::Text { text } if text.contains("MODE: Fix Specific Error (Debug)")));
        assert!(matches!(&parts[1], RequestPart::Text { text } if text.starts_with("--- FILE: a.py ---")));
        assert!(matches!(
            &parts[2],
            RequestPart::File { file_data } if file_data.file_uri == "https://example.test/files/m1"
        ));
        assert!(matches!(&parts[3], RequestPart::Text { text } if text.contains("[MEDIA CONTEXT: call.mp3]")));
    }

    #[test]
    fn remote_file_maps_state_and_error() {
        let resource: FileResource = serde_json::from_str(
            r#"{"name":"files/z9","uri":"https://x/files/z9","mimeType":"audio/wav","state":"FAILED","error":{"code":3,"message":"unsupported codec"}}"#,
        )
        .unwrap();
        let file = remote_file(resource);
        assert_eq!(file.id, "files/z9");
        assert_eq!(file.state, RemoteFileState::Failed);
        assert_eq!(file.error.as_deref(), Some("unsupported codec"));
    }

    #[test]
    fn resource_name_is_normalized() {
        assert_eq!(resource_name("files/abc"), "files/abc");
        assert_eq!(resource_name("abc"), "files/abc");
    }

    #[test]
    fn client_builds_from_config() {
        let mut config = DistillerConfig::new("key");
        config.base_url = "http://localhost:9/".into();
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(client.model(), crate::config::DEFAULT_MODEL);
        assert_eq!(client.base_url, "http://localhost:9");
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        let mut config = DistillerConfig::new("key");
        config.base_url = "http://127.0.0.1:9".into();
        config.retry = RetryPolicy::none();
        let client = GeminiClient::new(&config).unwrap();

        let err = client.status("files/none").unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
