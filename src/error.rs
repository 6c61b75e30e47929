use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to open {path:?}: {source}")]
    FileNotFound { path: PathBuf, source: io::Error },
    #[error("malformed asset: {0}")]
    MalformedAsset(String),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

impl RenderError {
    /// Shorthand for a malformed-asset error with formatted context.
    pub fn malformed(message: impl Into<String>) -> RenderError {
        RenderError::MalformedAsset(message.into())
    }
}
