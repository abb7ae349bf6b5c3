pub mod types;
pub mod retry;
pub mod gemini;
pub mod gemini_types;
pub mod mock;

pub use types::*;
pub use retry::*;
pub use gemini::*;
pub use gemini_types::*;
pub use mock::*;

use thiserror::Error;

/// Errors raised by the remote model service.
///
/// Messages taken from the service's error body are kept verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Authentication rejected: {0}")]
    Authentication(String),

    #[error("Quota exhausted: {0}")]
    Quota(String),

    #[error("Payload rejected by backend: {0}")]
    MalformedPayload(String),

    #[error("Backend returned error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Generation blocked: {0}")]
    Blocked(String),
}

impl BackendError {
    /// Failures worth retrying: the request may succeed unchanged later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
