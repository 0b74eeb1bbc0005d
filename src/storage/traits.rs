//! Storage collaborator trait definitions

use super::types::{NewRecordingRecord, RecordingRecord, StorageStatus, UploadStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by storage collaborators
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record not found: {0}")]
    NotFound(i64),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Durable store for recording records
///
/// Only the operations the core calls are part of this contract; the host
/// side of the store (upload bookkeeping, querying for display) is free to
/// carry whatever else it needs.
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// Insert a record, returning the generated key
    async fn insert(&self, record: NewRecordingRecord) -> Result<i64, StorageError>;

    /// Look up a record by the absolute path of its backing file
    async fn get_by_file_path(&self, path: &Path)
        -> Result<Option<RecordingRecord>, StorageError>;

    /// All `Uploaded` records whose end time is before `cutoff`
    async fn get_uploaded_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RecordingRecord>, StorageError>;

    /// Delete a record by key
    async fn delete(&self, id: i64) -> Result<(), StorageError>;

    /// Total `file_size_bytes` across all tracked records
    async fn total_file_size_bytes(&self) -> Result<u64, StorageError>;

    /// Number of records with the given upload status
    async fn count_with_status(&self, status: UploadStatus) -> Result<u64, StorageError>;
}

/// Lists candidate segment files for the recovery pass
#[async_trait]
pub trait SegmentFileLister: Send + Sync {
    async fn list_segment_files(&self) -> Result<Vec<PathBuf>, StorageError>;
}

/// Reports local storage headroom
pub trait StorageMonitor: Send + Sync {
    fn status(&self) -> StorageStatus;
    fn available_bytes(&self) -> u64;
}
