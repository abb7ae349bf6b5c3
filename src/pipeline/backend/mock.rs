use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::{GenerativeBackend, MediaStore, RemoteFile, RemoteFileState};
use super::BackendError;
use crate::pipeline::assembly::Payload;

/// Scripted in-memory backend for tests and offline runs.
///
/// Uploads report `upload_state`; each status call pops the next scripted
/// state (falling back to `Active` when the script is exhausted). Every
/// generate call records the payload it received.
pub struct MockBackend {
    reply: Result<String, BackendError>,
    upload_state: RemoteFileState,
    upload_error: Option<BackendError>,
    failing_media: HashSet<String>,
    missing_uri: bool,
    statuses: Mutex<VecDeque<RemoteFileState>>,
    uploads: Mutex<Vec<String>>,
    status_calls: Mutex<usize>,
    payloads: Mutex<Vec<Payload>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBackend {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            upload_state: RemoteFileState::Active,
            upload_error: None,
            failing_media: HashSet::new(),
            missing_uri: false,
            statuses: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(Vec::new()),
            status_calls: Mutex::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    /// Make every generate call fail with `error`.
    pub fn with_generate_error(mut self, error: BackendError) -> Self {
        self.reply = Err(error);
        self
    }

    /// State reported by the upload response itself.
    pub fn with_upload_state(mut self, state: RemoteFileState) -> Self {
        self.upload_state = state;
        self
    }

    /// Make every upload fail with `error`.
    pub fn with_upload_error(mut self, error: BackendError) -> Self {
        self.upload_error = Some(error);
        self
    }

    /// States returned by successive status calls.
    pub fn with_status_sequence(self, states: Vec<RemoteFileState>) -> Self {
        *locked(&self.statuses) = states.into();
        self
    }

    /// Remote processing of `name` ends in `FAILED`.
    pub fn with_failing_media(mut self, name: &str) -> Self {
        self.failing_media.insert(name.to_string());
        self
    }

    /// Report files without a URI, as a misbehaving store would.
    pub fn with_missing_uri(mut self) -> Self {
        self.missing_uri = true;
        self
    }

    /// Names passed to `upload`, in call order.
    pub fn uploaded(&self) -> Vec<String> {
        locked(&self.uploads).clone()
    }

    pub fn status_calls(&self) -> usize {
        *locked(&self.status_calls)
    }

    /// Payloads passed to `generate`, in call order.
    pub fn payloads(&self) -> Vec<Payload> {
        locked(&self.payloads).clone()
    }

    fn remote_file(&self, index: usize, mime_type: &str, state: RemoteFileState) -> RemoteFile {
        RemoteFile {
            id: format!("files/mock-{index}"),
            uri: if self.missing_uri {
                String::new()
            } else {
                format!("https://mock.invalid/v1beta/files/mock-{index}")
            },
            mime_type: mime_type.to_string(),
            state,
            error: (state == RemoteFileState::Failed).then(|| "mock processing failure".to_string()),
        }
    }
}

impl MediaStore for MockBackend {
    fn upload(&self, name: &str, _bytes: &[u8], mime_type: &str) -> Result<RemoteFile, BackendError> {
        if let Some(error) = &self.upload_error {
            return Err(error.clone());
        }
        let mut uploads = locked(&self.uploads);
        uploads.push(name.to_string());

        let state = if self.failing_media.contains(name) {
            RemoteFileState::Failed
        } else {
            self.upload_state
        };
        Ok(self.remote_file(uploads.len(), mime_type, state))
    }

    fn status(&self, remote_id: &str) -> Result<RemoteFile, BackendError> {
        *locked(&self.status_calls) += 1;
        let state = locked(&self.statuses)
            .pop_front()
            .unwrap_or(RemoteFileState::Active);

        let index = remote_id
            .rsplit('-')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        Ok(self.remote_file(index, "application/octet-stream", state))
    }
}

impl GenerativeBackend for MockBackend {
    fn generate(&self, payload: &Payload) -> Result<String, BackendError> {
        locked(&self.payloads).push(payload.clone());
        self.reply.clone()
    }
}
