//! Recording session core
//!
//! This module implements the chunked-recording architecture:
//! - ChunkManager for segment allocation, naming, timing, and finalization
//! - SessionOrchestrator driving the encoder and the chunk lifecycle
//! - PeriodicTask as the shared cancellable timer primitive

pub mod chunk;
pub mod chunk_manager;
pub mod orchestrator;
pub mod state;
pub mod timer;

pub use chunk::{ChunkDescriptor, CompletedChunk, SegmentKind};
pub use chunk_manager::{ChunkError, ChunkManager};
pub use orchestrator::{RecordingEvent, SessionOrchestrator, SessionSummary};
pub use state::{RecorderConfig, RecorderState};
pub use timer::PeriodicTask;
