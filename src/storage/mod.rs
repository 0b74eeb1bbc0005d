//! Durable-store collaborator contracts and record types
//!
//! The relational store itself lives in the host; the core only speaks the
//! operations declared here. Two small implementations ship with the crate:
//! - `MemoryStore`: an in-memory `RecordingStore`
//! - `DirectoryLister`: a `SegmentFileLister` over one directory

pub mod lister;
pub mod memory;
pub mod traits;
pub mod types;

pub use lister::DirectoryLister;
pub use memory::MemoryStore;
pub use traits::{RecordingStore, SegmentFileLister, StorageError, StorageMonitor};
pub use types::{
    NewRecordingRecord, RecordingRecord, RetentionStats, StorageStatus, UploadStatus,
};
