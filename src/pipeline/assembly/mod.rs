pub mod payload;
pub mod prompt;
pub mod assembler;

pub use payload::*;
pub use prompt::*;
pub use assembler::*;

use thiserror::Error;

/// Per-input problems never surface here; they are inline payload failures.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Assembly cancelled")]
    Cancelled,
}
