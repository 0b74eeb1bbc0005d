//! Capture collaborator contracts
//!
//! The core never touches an audio encoder or a platform wake lock directly.
//! Both sit behind the traits defined here and are implemented by the host.

pub mod traits;

pub use traits::{AudioRecorder, CaptureError, RecordingQuality, WakeGuard, WakeLock};
