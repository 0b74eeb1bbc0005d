//! Segment descriptors and the filename contract
//!
//! Two filename shapes exist on disk and the distinction is load-bearing for
//! crash recovery:
//! - in-progress: `chunk-<session-id>-<NNN>.m4a` (zero-padded chunk suffix)
//! - finalized:   `rec-<session-id>-<YYYYMMDD>-<HHMMSS>-<tz>.m4a` (start
//!   stamp, no chunk suffix)
//!
//! Both shapes embed the session identity, so segments of sessions whose
//! chunks start within the same wall-clock second can never rename onto
//! each other.
//!
//! A file still carrying a chunk suffix after a restart was mid-write when
//! the process died and must not be treated as a finished artifact.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix of segment files still being written
pub const IN_PROGRESS_PREFIX: &str = "chunk";

/// Prefix of finalized segment files
pub const FINALIZED_PREFIX: &str = "rec";

/// Extension shared by all segment files
pub const SEGMENT_EXT: &str = "m4a";

/// An open recording segment, owned by the ChunkManager until completion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkDescriptor {
    /// Identity of the owning session, constant across its chunks
    pub session_id: String,

    /// 1-based position within the session
    pub chunk_number: u32,

    /// In-progress file the encoder writes into
    pub path: PathBuf,

    pub started_at: DateTime<Local>,
}

/// A finalized recording segment
///
/// Produced exactly once per chunk; by the time one is observable its file
/// has already been renamed to the finalized name in `path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedChunk {
    pub session_id: String,
    pub chunk_number: u32,

    /// Finalized file path
    pub path: PathBuf,

    pub started_at: DateTime<Local>,

    /// End instant, >= `started_at`
    pub ended_at: DateTime<Local>,
}

/// Classification of a segment file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    InProgress { chunk_number: u32 },
    Finalized { started_at: NaiveDateTime },
}

// Last issued session stamp in unix millis. Forced strictly increasing so
// sessions opened back-to-back within one clock tick still get distinct ids.
static LAST_STAMP_MS: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh session identity from the local clock
pub fn next_session_id() -> String {
    let now_ms = Local::now().timestamp_millis().max(0) as u64;
    let prev = LAST_STAMP_MS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
            Some(prev.saturating_add(1).max(now_ms))
        })
        .unwrap_or_else(|prev| prev);
    let stamp = prev.saturating_add(1).max(now_ms);

    let dt = Local
        .timestamp_millis_opt(stamp as i64)
        .single()
        .unwrap_or_else(Local::now);
    dt.format("%Y%m%d-%H%M%S-%3f").to_string()
}

/// File name for an open segment
pub fn in_progress_name(session_id: &str, chunk_number: u32) -> String {
    format!("{IN_PROGRESS_PREFIX}-{session_id}-{chunk_number:03}.{SEGMENT_EXT}")
}

/// File name for a finalized segment: session identity plus start instant
pub fn finalized_name(session_id: &str, started_at: &DateTime<Local>) -> String {
    format!(
        "{FINALIZED_PREFIX}-{session_id}-{}-{}.{SEGMENT_EXT}",
        started_at.format("%Y%m%d-%H%M%S"),
        tz_label(started_at)
    )
}

/// Sanitized timezone label for file names, e.g. `utc+0530`
///
/// chrono cannot name the IANA zone behind `Local`, so the label carries the
/// fixed UTC offset of the instant instead.
pub fn tz_label(dt: &DateTime<Local>) -> String {
    let secs = dt.offset().local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.abs();
    format!("utc{}{:02}{:02}", sign, abs / 3600, (abs % 3600) / 60)
}

/// Classify a segment file name, or `None` if it matches neither shape
pub fn classify(file_name: &str) -> Option<SegmentKind> {
    let stem = file_name.strip_suffix(&format!(".{SEGMENT_EXT}"))?;

    if let Some(rest) = stem.strip_prefix(&format!("{IN_PROGRESS_PREFIX}-")) {
        let (_, suffix) = rest.rsplit_once('-')?;
        if suffix.len() == 3 && suffix.bytes().all(|b| b.is_ascii_digit()) {
            let chunk_number = suffix.parse().ok()?;
            return Some(SegmentKind::InProgress { chunk_number });
        }
        return None;
    }

    if let Some(rest) = stem.strip_prefix(&format!("{FINALIZED_PREFIX}-")) {
        // <session-id>-<YYYYMMDD>-<HHMMSS>-<tz label>
        let (front, _tz) = rest.rsplit_once("-utc")?;
        let split = front.len().checked_sub(16)?;
        let (session_id, tail) = (front.get(..split)?, front.get(split..)?);
        if session_id.is_empty() {
            return None;
        }
        let stamp = tail.strip_prefix('-')?;
        let started_at = NaiveDateTime::parse_from_str(stamp, "%Y%m%d-%H%M%S").ok()?;
        return Some(SegmentKind::Finalized { started_at });
    }

    None
}
