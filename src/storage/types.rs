//! Persisted record types and storage status classification

use crate::recorder::chunk::CompletedChunk;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upload lifecycle of a persisted recording
///
/// Mutated by the host's upload machinery; the core only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

/// Coarse classification of remaining local storage headroom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageStatus {
    Normal,
    Low,
    Critical,
}

/// A recording segment as tracked by the durable store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRecord {
    /// Store-generated key
    pub id: i64,

    /// Identity of the session this segment belongs to
    pub session_id: String,

    /// 1-based chunk number within the session
    pub chunk_number: u32,

    /// Absolute path of the finalized segment file
    pub file_path: PathBuf,

    /// Segment start instant
    pub started_at: DateTime<Utc>,

    /// Segment end instant (>= started_at)
    pub ended_at: DateTime<Utc>,

    /// UTC offset of the local zone at segment start, e.g. "+05:30"
    pub timezone_id: String,

    /// Whole seconds between start and end
    pub duration_seconds: i64,

    /// Size of the finalized file
    pub file_size_bytes: u64,

    /// Content hash, filled in by the upload machinery
    pub md5_hash: Option<String>,

    pub upload_status: UploadStatus,

    /// Upload batch this segment was routed into, if any
    pub batch_id: Option<String>,
}

/// An insert-ready recording record (no generated key yet)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecordingRecord {
    pub session_id: String,
    pub chunk_number: u32,
    pub file_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub timezone_id: String,
    pub duration_seconds: i64,
    pub file_size_bytes: u64,
    pub md5_hash: Option<String>,
    pub upload_status: UploadStatus,
    pub batch_id: Option<String>,
}

impl NewRecordingRecord {
    /// Build an insert-ready record from a completed chunk
    ///
    /// The completion event does not carry the file size, so the persisting
    /// consumer reads it from the filesystem and passes it in.
    pub fn from_completed(chunk: &CompletedChunk, file_size_bytes: u64) -> Self {
        let duration = (chunk.ended_at - chunk.started_at).num_seconds().max(0);
        Self {
            session_id: chunk.session_id.clone(),
            chunk_number: chunk.chunk_number,
            file_path: chunk.path.clone(),
            started_at: chunk.started_at.with_timezone(&Utc),
            ended_at: chunk.ended_at.with_timezone(&Utc),
            timezone_id: chunk.started_at.offset().to_string(),
            duration_seconds: duration,
            file_size_bytes,
            md5_hash: None,
            upload_status: UploadStatus::Pending,
            batch_id: None,
        }
    }

    pub fn into_record(self, id: i64) -> RecordingRecord {
        RecordingRecord {
            id,
            session_id: self.session_id,
            chunk_number: self.chunk_number,
            file_path: self.file_path,
            started_at: self.started_at,
            ended_at: self.ended_at,
            timezone_id: self.timezone_id,
            duration_seconds: self.duration_seconds,
            file_size_bytes: self.file_size_bytes,
            md5_hash: self.md5_hash,
            upload_status: self.upload_status,
            batch_id: self.batch_id,
        }
    }
}

/// Aggregated retention/storage view, a pure read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionStats {
    /// Bytes consumed by tracked recordings
    pub total_bytes_used: u64,

    /// Recordings still waiting for upload
    pub pending_count: u64,

    /// Recordings whose upload failed
    pub failed_count: u64,

    /// Bytes still available on the volume
    pub available_bytes: u64,

    pub storage_status: StorageStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_camel_case_keys() {
        let record = RecordingRecord {
            id: 7,
            session_id: "20260828-120000-000".to_string(),
            chunk_number: 2,
            file_path: PathBuf::from("/tmp/rec-20260828-120000-000-20260828-120500-utc+0000.m4a"),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            timezone_id: "+00:00".to_string(),
            duration_seconds: 1800,
            file_size_bytes: 1024,
            md5_hash: None,
            upload_status: UploadStatus::Pending,
            batch_id: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sessionId"], "20260828-120000-000");
        assert_eq!(json["chunkNumber"], 2);
        assert_eq!(json["uploadStatus"], "pending");
        assert_eq!(json["fileSizeBytes"], 1024);
    }

    #[test]
    fn status_enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&StorageStatus::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(
            serde_json::to_string(&UploadStatus::Uploaded).unwrap(),
            "\"uploaded\""
        );
    }
}
