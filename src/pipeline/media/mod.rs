pub mod types;
pub mod uploader;

pub use types::*;
pub use uploader::*;

use thiserror::Error;

use crate::pipeline::backend::BackendError;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Media upload failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Media {name} still processing after {waited_secs}s")]
    ProcessingTimeout { name: String, waited_secs: u64 },

    #[error("Media upload cancelled")]
    Cancelled,

    #[error("Illegal media state transition: {from} -> {to}")]
    IllegalTransition { from: MediaState, to: MediaState },
}
