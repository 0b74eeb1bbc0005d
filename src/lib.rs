//! chunkrec - continuous chunked-recording session core.
//!
//! Turns an open-ended recording session into a sequence of bounded-duration
//! file segments, tracks their lifecycle through a durable store, recovers
//! from unclean termination, and enforces storage-bounded retention. The
//! audio encoder, the store itself, upload transport, and platform lifecycle
//! all live in the host behind the trait seams in `capture` and `storage`.

pub mod capture;
pub mod maintenance;
pub mod recorder;
pub mod storage;
pub mod utils;

pub use capture::{AudioRecorder, RecordingQuality, WakeLock};
pub use maintenance::{OrphanRecoveryManager, RetentionManager};
pub use recorder::{
    ChunkManager, CompletedChunk, RecorderConfig, RecorderState, RecordingEvent,
    SessionOrchestrator,
};
pub use storage::{RecordingStore, SegmentFileLister, StorageMonitor, UploadStatus};
pub use utils::{RecorderError, RecorderResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for hosts that have no subscriber of their own
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chunkrec=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("chunkrec v{} initialized", env!("CARGO_PKG_VERSION"));
}
