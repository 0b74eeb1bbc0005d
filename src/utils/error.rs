//! Error types and handling
//!
//! Common error types used across the crate. Each subsystem defines its own
//! thiserror enum; this is the crate-wide aggregate returned at the public
//! boundary.

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chunk error: {0}")]
    Chunk(#[from] crate::recorder::ChunkError),

    #[error("Capture error: {0}")]
    Capture(#[from] crate::capture::CaptureError),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;
