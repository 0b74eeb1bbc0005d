//! Storage-bounded retention
//!
//! Deletes segments that are both uploaded and older than the retention
//! window, with an emergency path that evicts oldest-first while the
//! volume stays critical. The file always goes before its record: a record
//! may never outlive its backing file's eligibility guarantees.

use crate::storage::{RecordingStore, RetentionStats, StorageError, StorageMonitor, UploadStatus};
use crate::utils::RecorderResult;
use chrono::{Duration, Utc};
use std::path::Path;
use std::sync::Arc;

/// Minimum retention window in minutes
pub const MIN_RETENTION_MINUTES: i64 = 5;

/// Maximum retention window in minutes
pub const MAX_RETENTION_MINUTES: i64 = 1440;

/// Enforces age- and pressure-based eviction of uploaded segments
pub struct RetentionManager {
    store: Arc<dyn RecordingStore>,
    monitor: Arc<dyn StorageMonitor>,
}

impl RetentionManager {
    pub fn new(store: Arc<dyn RecordingStore>, monitor: Arc<dyn StorageMonitor>) -> Self {
        Self { store, monitor }
    }

    /// Delete uploaded recordings older than the retention window
    ///
    /// The window clamps to [5, 1440] minutes. Per-record failures are
    /// swallowed so partial progress is preserved; returns the number of
    /// records actually deleted.
    pub async fn cleanup_old_recordings(&self, retention_minutes: i64) -> RecorderResult<u64> {
        let window = retention_minutes.clamp(MIN_RETENTION_MINUTES, MAX_RETENTION_MINUTES);
        if window != retention_minutes {
            tracing::debug!(
                requested = retention_minutes,
                effective = window,
                "retention window clamped"
            );
        }

        let cutoff = Utc::now() - Duration::minutes(window);
        let candidates = self.store.get_uploaded_before(cutoff).await?;

        let mut deleted = 0u64;
        for record in candidates {
            if !delete_backing_file(&record.file_path).await {
                continue;
            }
            match self.store.delete(record.id).await {
                Ok(()) => {
                    tracing::debug!(id = record.id, file = %record.file_path.display(), "recording evicted");
                    deleted += 1;
                }
                Err(e) => tracing::warn!(id = record.id, "record delete failed: {e}"),
            }
        }

        tracing::info!(deleted, window_minutes = window, "retention pass finished");
        Ok(deleted)
    }

    /// Evict oldest-started uploaded recordings while storage is critical
    ///
    /// Breaks out as soon as no eligible record remains or a file deletion
    /// fails; spinning while deletion cannot succeed helps nobody.
    pub async fn emergency_cleanup(&self) -> RecorderResult<u64> {
        let mut deleted = 0u64;

        while self.monitor.status() == crate::storage::StorageStatus::Critical {
            let candidates = self.store.get_uploaded_before(Utc::now()).await?;
            let Some(oldest) = candidates.into_iter().min_by_key(|r| r.started_at) else {
                tracing::warn!("storage critical but no uploaded recording left to evict");
                break;
            };

            if !delete_backing_file(&oldest.file_path).await {
                break;
            }
            if let Err(e) = self.store.delete(oldest.id).await {
                tracing::warn!(id = oldest.id, "record delete failed: {e}");
                break;
            }

            tracing::info!(id = oldest.id, file = %oldest.file_path.display(), "emergency eviction");
            deleted += 1;
        }

        Ok(deleted)
    }

    /// Aggregate storage/retention view; a pure read
    pub async fn retention_stats(&self) -> Result<RetentionStats, StorageError> {
        Ok(RetentionStats {
            total_bytes_used: self.store.total_file_size_bytes().await?,
            pending_count: self.store.count_with_status(UploadStatus::Pending).await?,
            failed_count: self.store.count_with_status(UploadStatus::Failed).await?,
            available_bytes: self.monitor.available_bytes(),
            storage_status: self.monitor.status(),
        })
    }
}

/// Remove a segment file, returning whether it is gone
///
/// A file that is already absent counts as deleted: the record behind it
/// would otherwise be stranded forever.
async fn delete_backing_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(file = %path.display(), "backing file already gone");
            true
        }
        Err(e) => {
            tracing::warn!(file = %path.display(), "file delete failed: {e}");
            false
        }
    }
}
