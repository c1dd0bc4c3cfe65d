//! Core errors

use thiserror::Error;
use tracing::error;

/// Failure categories surfaced by the session registry and the file manager.
///
/// Callers branch on the kind, never on the root cause. Underlying OS errors
/// are logged where they happen and collapse into [`CoreError::Filesystem`].
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("No session attached to request")]
    NilSession,

    #[error("Session not found")]
    SessionNotFound,

    #[error("File not found")]
    FileNotFound,

    #[error("Tile {dx}x{dy} is too small, minimum is {min}x{min}")]
    TileTooSmall { dx: u32, dy: u32, min: u32 },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("Filesystem error")]
    Filesystem,
}

/// Errors raised by the image codec.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Tile {dx}x{dy} is too small, minimum is {min}x{min}")]
    TileTooSmall { dx: u32, dy: u32, min: u32 },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Encode error: {0}")]
    Encode(String),
}

impl From<CodecError> for CoreError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::TileTooSmall { dx, dy, min } => CoreError::TileTooSmall { dx, dy, min },
            CodecError::UnsupportedFormat(msg) => CoreError::UnsupportedFormat(msg),
            other => {
                error!("codec failure: {}", other);
                CoreError::Filesystem
            }
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
