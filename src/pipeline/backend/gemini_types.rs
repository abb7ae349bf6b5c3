use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// generateContent request
// ═══════════════════════════════════════════════════════════

/// Request body for `POST /v1beta/models/{model}:generateContent`
#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub role: String,
    pub parts: Vec<RequestPart>,
}

/// One part of a user turn: inline text or a reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestPart {
    Text { text: String },
    File { file_data: FileData },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

// ═══════════════════════════════════════════════════════════
// generateContent response
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// Files API
// ═══════════════════════════════════════════════════════════

/// Metadata sent when opening a resumable upload session.
#[derive(Debug, Serialize)]
pub struct UploadStartRequest<'a> {
    pub file: UploadMetadata<'a>,
}

#[derive(Debug, Serialize)]
pub struct UploadMetadata<'a> {
    pub display_name: &'a str,
}

/// Upload finalize response: `{"file": {...}}`
#[derive(Debug, Deserialize)]
pub struct FileEnvelope {
    pub file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    /// Resource name, `files/{id}`.
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub message: String,
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

/// Error body: `{"error": {"code": 400, "message": "...", "status": "INVALID_ARGUMENT"}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}
