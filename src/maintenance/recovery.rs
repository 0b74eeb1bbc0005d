//! Orphaned segment recovery
//!
//! After a crash, kill, or OS eviction the completion event for a finalized
//! segment may have been lost before it reached the store. This pass walks
//! the segment directory and re-synthesizes records for finalized files the
//! store does not know about.

use crate::recorder::chunk::{self, SegmentKind};
use crate::storage::{
    NewRecordingRecord, RecordingStore, SegmentFileLister, StorageError, UploadStatus,
};
use crate::utils::RecorderResult;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;

/// Reconciles the filesystem's segment files against the durable store
pub struct OrphanRecoveryManager {
    store: Arc<dyn RecordingStore>,
    lister: Arc<dyn SegmentFileLister>,
}

impl OrphanRecoveryManager {
    pub fn new(store: Arc<dyn RecordingStore>, lister: Arc<dyn SegmentFileLister>) -> Self {
        Self { store, lister }
    }

    /// Run one recovery pass, returning the ids of the records inserted
    ///
    /// Files still carrying an in-progress name were mid-session when the
    /// process died and are skipped without even a store lookup. A failure
    /// on one file never aborts the pass.
    pub async fn recover_orphans(&self) -> RecorderResult<Vec<i64>> {
        let files = self.lister.list_segment_files().await?;
        let mut recovered = Vec::new();

        for path in files {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let started_at = match chunk::classify(name) {
                Some(SegmentKind::Finalized { started_at }) => started_at,
                Some(SegmentKind::InProgress { .. }) => {
                    tracing::debug!(file = name, "in-progress segment, not an orphan");
                    continue;
                }
                None => {
                    tracing::debug!(file = name, "unrecognized segment name, skipped");
                    continue;
                }
            };

            match self.store.get_by_file_path(&path).await {
                Ok(Some(_)) => continue, // already tracked
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(file = name, "orphan lookup failed: {e}");
                    continue;
                }
            }

            let record = match synthesize_record(&path, started_at).await {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(file = name, "failed to synthesize orphan record: {e}");
                    continue;
                }
            };

            match self.store.insert(record).await {
                Ok(id) => {
                    tracing::info!(file = name, id, "orphan recovered");
                    recovered.push(id);
                }
                Err(e) => tracing::warn!(file = name, "orphan insert failed: {e}"),
            }
        }

        if !recovered.is_empty() {
            tracing::info!(count = recovered.len(), "orphan recovery pass finished");
        }
        Ok(recovered)
    }
}

/// Build a record for an untracked finalized segment
///
/// Start time comes from the filename; end time and size from file
/// metadata. The synthesized session identity carries an `orphan-` prefix
/// so it can never collide with a live session's.
async fn synthesize_record(
    path: &Path,
    started_at: NaiveDateTime,
) -> Result<NewRecordingRecord, StorageError> {
    let meta = tokio::fs::metadata(path).await?;

    let started_local = Local
        .from_local_datetime(&started_at)
        .earliest()
        .unwrap_or_else(Local::now);
    let started_utc = started_local.with_timezone(&Utc);

    let ended_utc = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(started_utc)
        .max(started_utc);

    Ok(NewRecordingRecord {
        session_id: format!("orphan-{}", started_at.format("%Y%m%d-%H%M%S")),
        chunk_number: 1,
        file_path: path.to_path_buf(),
        started_at: started_utc,
        ended_at: ended_utc,
        timezone_id: started_local.offset().to_string(),
        duration_seconds: (ended_utc - started_utc).num_seconds().max(0),
        file_size_bytes: meta.len(),
        md5_hash: None,
        upload_status: UploadStatus::Pending,
        batch_id: None,
    })
}
