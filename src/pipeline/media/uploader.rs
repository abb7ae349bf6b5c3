use std::sync::Arc;
use std::time::Instant;

use super::types::{MediaHandle, MediaState};
use super::UploadError;
use crate::config::PollPolicy;
use crate::pipeline::backend::{MediaStore, RemoteFile, RemoteFileState};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::import::guess_mime;

/// Uploads media to the remote store and waits until it is usable.
pub struct MediaUploader {
    store: Arc<dyn MediaStore>,
    poll: PollPolicy,
    cancel: CancelFlag,
}

impl MediaUploader {
    pub fn new(store: Arc<dyn MediaStore>, poll: PollPolicy, cancel: CancelFlag) -> Self {
        Self { store, poll, cancel }
    }

    /// Upload one item and poll until it is READY or FAILED.
    ///
    /// A remote FAILED is not an error: the handle comes back with
    /// `state() == Failed` and the service's reason in `failure`.
    pub fn upload(
        &self,
        name: &str,
        bytes: &[u8],
        mime_hint: Option<&str>,
    ) -> Result<MediaHandle, UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let mime_type = mime_hint
            .map(str::to_string)
            .unwrap_or_else(|| guess_mime(name));
        let mut handle = MediaHandle::new(name, &mime_type);

        tracing::info!(media = %name, size_bytes = bytes.len(), mime = %mime_type, "Uploading media");

        let remote = self.store.upload(name, bytes, &mime_type)?;
        handle.remote_id = Some(remote.id.clone());
        if !remote.mime_type.is_empty() {
            handle.mime_type = remote.mime_type.clone();
        }
        handle.transition(MediaState::Processing)?;
        observe(&mut handle, &remote)?;

        let started = Instant::now();
        while handle.state() == MediaState::Processing {
            if started.elapsed() >= self.poll.timeout {
                tracing::warn!(
                    media = %name,
                    polls = handle.polls,
                    timeout_secs = self.poll.timeout.as_secs(),
                    "Media processing timed out"
                );
                return Err(UploadError::ProcessingTimeout {
                    name: name.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            if !self.cancel.wait(self.poll.interval) {
                return Err(UploadError::Cancelled);
            }

            let status = self.store.status(&remote.id)?;
            handle.polls += 1;
            observe(&mut handle, &status)?;
        }

        match handle.state() {
            MediaState::Failed => tracing::warn!(
                media = %name,
                reason = handle.failure.as_deref().unwrap_or("unknown"),
                "Remote media processing failed"
            ),
            _ => tracing::info!(media = %name, polls = handle.polls, "Media ready"),
        }

        Ok(handle)
    }
}

/// Apply one remote observation to the handle.
fn observe(handle: &mut MediaHandle, remote: &RemoteFile) -> Result<(), UploadError> {
    if !remote.uri.is_empty() {
        handle.uri = Some(remote.uri.clone());
    }

    match remote.state {
        RemoteFileState::Processing => handle.transition(MediaState::Processing),
        RemoteFileState::Active => handle.transition(MediaState::Ready),
        RemoteFileState::Failed => {
            handle.failure = Some(
                remote
                    .error
                    .clone()
                    .unwrap_or_else(|| "remote processing failed".to_string()),
            );
            handle.transition(MediaState::Failed)
        }
    }
}
