use std::fmt;

use serde::{Deserialize, Serialize};

use super::UploadError;

/// Lifecycle of one uploaded media item.
///
/// ```text
/// UPLOADING ──→ PROCESSING ──→ READY
///     │             │ ↺
///     └─────────────┴──→ FAILED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaState {
    Uploading,
    Processing,
    Ready,
    Failed,
}

impl MediaState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    pub fn can_transition_to(self, next: MediaState) -> bool {
        use MediaState::*;
        matches!(
            (self, next),
            (Uploading, Processing)
                | (Uploading, Failed)
                | (Processing, Processing)
                | (Processing, Ready)
                | (Processing, Failed)
        )
    }
}

impl fmt::Display for MediaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uploading => "UPLOADING",
            Self::Processing => "PROCESSING",
            Self::Ready => "READY",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Local view of a remotely stored media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub local_name: String,
    pub remote_id: Option<String>,
    pub uri: Option<String>,
    pub mime_type: String,
    state: MediaState,
    /// Remote reason, set when the item ends in `FAILED`.
    pub failure: Option<String>,
    /// Status checks performed after the upload response.
    pub polls: u32,
}

impl MediaHandle {
    pub fn new(local_name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            remote_id: None,
            uri: None,
            mime_type: mime_type.into(),
            state: MediaState::Uploading,
            failure: None,
            polls: 0,
        }
    }

    pub fn state(&self) -> MediaState {
        self.state
    }

    /// Move to `next`, rejecting moves the lifecycle does not allow.
    pub fn transition(&mut self, next: MediaState) -> Result<(), UploadError> {
        if !self.state.can_transition_to(next) {
            return Err(UploadError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        if self.state != next {
            tracing::debug!(media = %self.local_name, from = %self.state, to = %next, "Media state change");
        }
        self.state = next;
        Ok(())
    }

    /// Reference usable in a payload. Only READY items with a URI have one.
    pub fn reference(&self) -> Option<MediaReference> {
        if self.state != MediaState::Ready {
            return None;
        }
        self.uri.as_ref().map(|uri| MediaReference {
            local_name: self.local_name.clone(),
            uri: uri.clone(),
            mime_type: self.mime_type.clone(),
        })
    }
}

/// A READY remote asset, referenced from the payload rather than inlined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub local_name: String,
    pub uri: String,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handle_is_uploading() {
        let handle = MediaHandle::new("call.mp3", "audio/mpeg");
        assert_eq!(handle.state(), MediaState::Uploading);
        assert!(!handle.state().is_terminal());
        assert!(handle.reference().is_none());
    }

    #[test]
    fn happy_path_transitions() {
        let mut handle = MediaHandle::new("call.mp3", "audio/mpeg");
        handle.transition(MediaState::Processing).unwrap();
        handle.transition(MediaState::Processing).unwrap();
        handle.uri = Some("https://x/files/1".into());
        handle.transition(MediaState::Ready).unwrap();
        assert!(handle.state().is_terminal());

        let reference = handle.reference().unwrap();
        assert_eq!(reference.local_name, "call.mp3");
        assert_eq!(reference.uri, "https://x/files/1");
    }

    #[test]
    fn terminal_states_do_not_move() {
        let mut handle = MediaHandle::new("a.wav", "audio/wav");
        handle.transition(MediaState::Processing).unwrap();
        handle.transition(MediaState::Failed).unwrap();

        let err = handle.transition(MediaState::Ready).unwrap_err();
        assert!(matches!(
            err,
            UploadError::IllegalTransition { from: MediaState::Failed, to: MediaState::Ready }
        ));
        assert_eq!(handle.state(), MediaState::Failed);
    }

    #[test]
    fn cannot_skip_processing() {
        let mut handle = MediaHandle::new("a.mp4", "video/mp4");
        assert!(handle.transition(MediaState::Ready).is_err());
    }

    #[test]
    fn display_is_upper_case() {
        assert_eq!(MediaState::Processing.to_string(), "PROCESSING");
        assert_eq!(MediaState::Ready.to_string(), "READY");
    }
}
