pub mod cancel;
pub mod import;
pub mod extraction;
pub mod backend;
pub mod media;
pub mod assembly;
pub mod processor;
