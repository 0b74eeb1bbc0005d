//! Recording state management
//!
//! Defines the recorder state machine states and session configuration.

use crate::capture::RecordingQuality;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum rotation interval
pub const MIN_CHUNK_MINUTES: u64 = 5;

/// Maximum rotation interval
pub const MAX_CHUNK_MINUTES: u64 = 120;

/// Default rotation interval when none was configured
pub const DEFAULT_CHUNK_MINUTES: u64 = 30;

/// Current state of the recording system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// No session has been started
    Idle,
    /// Currently recording
    Recording,
    /// Session open but the encoder is paused
    Paused,
    /// Session finished; a new one may be started
    Stopped,
}

impl Default for RecorderState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Configuration for the recording session core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Directory segment files are written into
    pub output_dir: PathBuf,

    /// Requested rotation interval; clamped to [5, 120] minutes on use
    pub chunk_duration_minutes: u64,

    /// Encoder quality preset
    pub quality: RecordingQuality,
}

impl RecorderConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            chunk_duration_minutes: DEFAULT_CHUNK_MINUTES,
            quality: RecordingQuality::default(),
        }
    }
}
