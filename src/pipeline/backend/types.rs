use std::fmt;

use super::BackendError;
use crate::pipeline::assembly::Payload;

/// Processing state of a remotely stored file, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFileState {
    Processing,
    Active,
    Failed,
}

impl RemoteFileState {
    /// Map the service's state string. Unknown or unspecified states are
    /// treated as still processing.
    pub fn from_api(state: Option<&str>) -> Self {
        match state {
            Some("ACTIVE") => Self::Active,
            Some("FAILED") => Self::Failed,
            _ => Self::Processing,
        }
    }
}

impl fmt::Display for RemoteFileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Processing => "PROCESSING",
            Self::Active => "ACTIVE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// A file as known to the remote media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Resource identifier used for status lookups (e.g. `files/abc123`).
    pub id: String,
    /// URI referenced from a generate request.
    pub uri: String,
    pub mime_type: String,
    pub state: RemoteFileState,
    /// Service-provided reason when `state` is `Failed`.
    pub error: Option<String>,
}

/// Remote storage for media that must be referenced, not inlined.
pub trait MediaStore: Send + Sync {
    fn upload(&self, name: &str, bytes: &[u8], mime_type: &str) -> Result<RemoteFile, BackendError>;

    fn status(&self, remote_id: &str) -> Result<RemoteFile, BackendError>;
}

/// Large-context model that turns an ordered payload into one text answer.
pub trait GenerativeBackend: Send + Sync {
    fn generate(&self, payload: &Payload) -> Result<String, BackendError>;
}
