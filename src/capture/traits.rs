//! Capture trait definitions
//!
//! Platform-agnostic contracts for the external audio encoder and the
//! exclusive wake-preventing resource.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by an [`AudioRecorder`] implementation
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("encoder failed to start: {0}")]
    StartFailed(String),

    #[error("encoder failed to pause: {0}")]
    PauseFailed(String),

    #[error("encoder failed to resume: {0}")]
    ResumeFailed(String),

    #[error("encoder failed to stop: {0}")]
    StopFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoder quality preset
///
/// Opaque to the core; passed straight through to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingQuality {
    Low,
    Standard,
    High,
}

impl Default for RecordingQuality {
    fn default() -> Self {
        Self::Standard
    }
}

/// External audio encoder contract
///
/// The orchestrator drives exactly one encoder per session. During rotation
/// the encoder is stopped on the current file and restarted on the next one;
/// implementations do not need to support concurrent files.
#[async_trait]
pub trait AudioRecorder: Send {
    /// Begin encoding into `path`
    async fn start(&mut self, path: &Path, quality: RecordingQuality) -> Result<(), CaptureError>;

    /// Pause the encoder without finalizing the file
    async fn pause(&mut self) -> Result<(), CaptureError>;

    /// Resume a paused encoder
    async fn resume(&mut self) -> Result<(), CaptureError>;

    /// Stop the encoder, finalizing its file, and return the written path
    async fn stop(&mut self) -> Result<PathBuf, CaptureError>;
}

/// Exclusive wake-preventing resource
///
/// `release` must be idempotent: the guard calls it on drop, and hosts may
/// also release eagerly.
pub trait WakeLock: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// Scoped acquisition of a [`WakeLock`]
///
/// Releases on drop, so every exit path out of a recording session, error
/// paths included, gives the resource back.
pub struct WakeGuard {
    lock: Arc<dyn WakeLock>,
}

impl WakeGuard {
    pub fn acquire(lock: Arc<dyn WakeLock>) -> Self {
        lock.acquire();
        Self { lock }
    }
}

impl Drop for WakeGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingLock {
        acquired: AtomicU32,
        released: AtomicU32,
    }

    impl WakeLock for CountingLock {
        fn acquire(&self) {
            self.acquired.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn wake_guard_releases_on_drop() {
        let lock = Arc::new(CountingLock::default());
        {
            let _guard = WakeGuard::acquire(lock.clone());
            assert_eq!(lock.acquired.load(Ordering::SeqCst), 1);
            assert_eq!(lock.released.load(Ordering::SeqCst), 0);
        }
        assert_eq!(lock.released.load(Ordering::SeqCst), 1);
    }
}
