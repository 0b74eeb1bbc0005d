//! In-memory recording store
//!
//! Backs the crate's own tests and is good enough for hosts that keep the
//! real store elsewhere (or are still wiring one up).

use super::traits::{RecordingStore, StorageError};
use super::types::{NewRecordingRecord, RecordingRecord, UploadStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

/// `RecordingStore` keeping all rows in memory
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<RecordingRecord>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Snapshot of all rows, in insertion order
    pub fn all(&self) -> Vec<RecordingRecord> {
        self.rows.lock().clone()
    }

    /// Flip a record's upload status in place
    pub fn set_upload_status(&self, id: i64, status: UploadStatus) {
        let mut rows = self.rows.lock();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.upload_status = status;
        }
    }
}

#[async_trait]
impl RecordingStore for MemoryStore {
    async fn insert(&self, record: NewRecordingRecord) -> Result<i64, StorageError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().push(record.into_record(id));
        Ok(id)
    }

    async fn get_by_file_path(
        &self,
        path: &Path,
    ) -> Result<Option<RecordingRecord>, StorageError> {
        Ok(self.rows.lock().iter().find(|r| r.file_path == path).cloned())
    }

    async fn get_uploaded_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RecordingRecord>, StorageError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.upload_status == UploadStatus::Uploaded && r.ended_at < cutoff)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<(), StorageError> {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(StorageError::NotFound(id));
        }
        Ok(())
    }

    async fn total_file_size_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.rows.lock().iter().map(|r| r.file_size_bytes).sum())
    }

    async fn count_with_status(&self, status: UploadStatus) -> Result<u64, StorageError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|r| r.upload_status == status)
            .count() as u64)
    }
}
