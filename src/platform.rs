//! Platform capability interfaces.
//!
//! Everything the pipeline needs from the host OS hides behind these
//! traits. Calls are asynchronous by contract: they return immediately and
//! deliver their outcome through a completion callback the embedder posts
//! back onto the UI queue. Failures travel through that callback as
//! [`ResourceError`] values; they never surface inside a tree walk.

use thiserror::Error;

/// What went wrong servicing a platform request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("resource not found: {uri}")]
    NotFound { uri: String },
    #[error("i/o failure: {0}")]
    Io(String),
    #[error("could not decode resource: {0}")]
    Decode(String),
    #[error("platform capability unavailable: {0}")]
    Unavailable(&'static str),
}

/// Completion callback for a byte-producing request.
pub type LoadCallback = Box<dyn FnOnce(Result<Vec<u8>, ResourceError>)>;

/// Completion callback for a text-producing request.
pub type TextCallback = Box<dyn FnOnce(Result<String, ResourceError>)>;

/// Asynchronous asset access.
pub trait ResourceLoader {
    fn load(&self, uri: &str, done: LoadCallback);
}

/// System clipboard access.
pub trait Clipboard {
    fn set_text(&self, text: &str);
    fn get_text(&self, done: TextCallback);
}
