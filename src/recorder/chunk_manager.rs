//! Chunk lifecycle management
//!
//! Allocates, names, times, and finalizes recording segments. Never touches
//! the audio encoder; the orchestrator writes into the files this manager
//! hands out.

use super::chunk::{self, ChunkDescriptor, CompletedChunk};
use super::state::{MAX_CHUNK_MINUTES, MIN_CHUNK_MINUTES};
use super::timer::PeriodicTask;
use chrono::Local;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Chunk lifecycle errors
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("a recording session is already open")]
    SessionAlreadyOpen,

    #[error("no recording session is open")]
    NoSession,

    #[error("the current chunk is still open")]
    ChunkStillOpen,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Owns the current in-progress segment, the rotation timer, and the stream
/// of completed segments
///
/// Completion events go out on an unbounded, order-preserving channel: they
/// drive persistence and therefore billing-visible state, so none may be
/// dropped no matter how slow the consumer is. The receiver is handed out
/// once via [`ChunkManager::take_completed`]; events emitted before anyone
/// listens stay buffered.
pub struct ChunkManager {
    output_dir: PathBuf,
    chunk_duration: Duration,
    session_id: Option<String>,
    chunk_number: u32,
    current: Option<ChunkDescriptor>,
    timer: Option<PeriodicTask>,
    completed_tx: mpsc::UnboundedSender<CompletedChunk>,
    completed_rx: Option<mpsc::UnboundedReceiver<CompletedChunk>>,
}

impl ChunkManager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        Self {
            output_dir: output_dir.into(),
            chunk_duration: Duration::from_secs(super::state::DEFAULT_CHUNK_MINUTES * 60),
            session_id: None,
            chunk_number: 0,
            current: None,
            timer: None,
            completed_tx,
            completed_rx: Some(completed_rx),
        }
    }

    /// Set the output directory and rotation interval
    ///
    /// Out-of-range intervals are clamped to [5, 120] minutes, never
    /// rejected.
    pub fn configure(&mut self, output_dir: &Path, chunk_duration_minutes: u64) {
        let clamped = chunk_duration_minutes.clamp(MIN_CHUNK_MINUTES, MAX_CHUNK_MINUTES);
        if clamped != chunk_duration_minutes {
            tracing::debug!(
                requested = chunk_duration_minutes,
                effective = clamped,
                "chunk duration clamped"
            );
        }
        self.output_dir = output_dir.to_path_buf();
        self.chunk_duration = Duration::from_secs(clamped * 60);
    }

    /// Open a new session and allocate chunk number 1
    pub fn start_new_session(&mut self) -> Result<ChunkDescriptor, ChunkError> {
        if self.session_id.is_some() {
            return Err(ChunkError::SessionAlreadyOpen);
        }

        std::fs::create_dir_all(&self.output_dir)?;

        let session_id = chunk::next_session_id();
        tracing::info!(session = %session_id, "opening recording session");

        self.session_id = Some(session_id.clone());
        self.chunk_number = 0;
        Ok(self.allocate_chunk(session_id))
    }

    /// Allocate the next chunk of the open session (chunk number += 1)
    ///
    /// The current chunk must have been completed first.
    pub fn start_next_chunk(&mut self) -> Result<ChunkDescriptor, ChunkError> {
        let Some(session_id) = self.session_id.clone() else {
            return Err(ChunkError::NoSession);
        };
        if self.current.is_some() {
            return Err(ChunkError::ChunkStillOpen);
        }
        Ok(self.allocate_chunk(session_id))
    }

    fn allocate_chunk(&mut self, session_id: String) -> ChunkDescriptor {
        self.chunk_number += 1;

        let descriptor = ChunkDescriptor {
            path: self
                .output_dir
                .join(chunk::in_progress_name(&session_id, self.chunk_number)),
            session_id,
            chunk_number: self.chunk_number,
            started_at: Local::now(),
        };
        self.current = Some(descriptor.clone());
        descriptor
    }

    /// Finalize the current chunk: stamp the end time, rename the file to
    /// its finalized name, and emit the completion event
    ///
    /// Returns `Ok(None)` when no chunk is open; that is a no-op, not an
    /// error. On a rename failure the chunk stays open so the caller can
    /// decide how to unwind.
    pub fn complete_current_chunk(&mut self) -> Result<Option<CompletedChunk>, ChunkError> {
        let Some(descriptor) = self.current.take() else {
            return Ok(None);
        };

        let final_path = self
            .output_dir
            .join(chunk::finalized_name(&descriptor.session_id, &descriptor.started_at));
        if let Err(e) = std::fs::rename(&descriptor.path, &final_path) {
            tracing::warn!(
                from = %descriptor.path.display(),
                to = %final_path.display(),
                "failed to finalize chunk: {e}"
            );
            self.current = Some(descriptor);
            return Err(e.into());
        }

        let completed = CompletedChunk {
            session_id: descriptor.session_id,
            chunk_number: descriptor.chunk_number,
            path: final_path,
            started_at: descriptor.started_at,
            ended_at: Local::now(),
        };

        tracing::info!(
            session = %completed.session_id,
            chunk = completed.chunk_number,
            file = %completed.path.display(),
            "chunk completed"
        );

        if self.completed_tx.send(completed.clone()).is_err() {
            // Consumer dropped its receiver; nothing left to notify
            tracing::debug!("completed-chunk receiver gone, event not delivered");
        }

        Ok(Some(completed))
    }

    /// Begin the rotation timer at the configured interval
    ///
    /// Each tick invokes `on_rotate`; the callback is expected to complete
    /// the current chunk and start the next one. Replaces any running timer.
    pub fn start_chunk_timer<F, Fut>(&mut self, on_rotate: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.stop_chunk_timer();
        tracing::debug!(interval_secs = self.chunk_duration.as_secs(), "rotation timer started");
        self.timer = Some(PeriodicTask::spawn("rotation", self.chunk_duration, on_rotate));
    }

    /// Stop the rotation timer; a no-op when none is running
    pub fn stop_chunk_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
    }

    /// Stop the timer, finalize the current chunk, and close the session
    pub fn end_session(&mut self) -> Result<Option<CompletedChunk>, ChunkError> {
        self.stop_chunk_timer();
        let completed = self.complete_current_chunk()?;
        if let Some(session_id) = self.session_id.take() {
            tracing::info!(session = %session_id, chunks = self.chunk_number, "session closed");
        }
        self.chunk_number = 0;
        Ok(completed)
    }

    /// Discard all session state without finalizing the current file
    ///
    /// Used on error unwind; no completion event is emitted and the
    /// in-progress file is left behind for the recovery pass to ignore.
    pub fn reset(&mut self) {
        self.stop_chunk_timer();
        self.current = None;
        self.session_id = None;
        self.chunk_number = 0;
    }

    /// Hand out the completed-chunk receiver; subsequent calls return `None`
    pub fn take_completed(&mut self) -> Option<mpsc::UnboundedReceiver<CompletedChunk>> {
        self.completed_rx.take()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_session_open(&self) -> bool {
        self.session_id.is_some()
    }

    pub fn current(&self) -> Option<&ChunkDescriptor> {
        self.current.as_ref()
    }

    /// Chunk number of the most recently allocated chunk (0 before any)
    pub fn current_chunk_number(&self) -> u32 {
        self.chunk_number
    }

    /// Effective rotation interval after clamping
    pub fn chunk_duration(&self) -> Duration {
        self.chunk_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager(dir: &Path) -> ChunkManager {
        ChunkManager::new(dir)
    }

    // The encoder normally creates the file; tests stand in for it.
    fn touch(path: &Path) {
        std::fs::write(path, b"audio").unwrap();
    }

    #[test]
    fn configure_clamps_to_valid_range() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        mgr.configure(dir.path(), 1);
        assert_eq!(mgr.chunk_duration(), Duration::from_secs(5 * 60));

        mgr.configure(dir.path(), 600);
        assert_eq!(mgr.chunk_duration(), Duration::from_secs(120 * 60));

        mgr.configure(dir.path(), 30);
        assert_eq!(mgr.chunk_duration(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn new_session_starts_at_chunk_one() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        let desc = mgr.start_new_session().unwrap();
        assert_eq!(desc.chunk_number, 1);
        assert!(desc.path.starts_with(dir.path()));
        assert!(matches!(
            mgr.start_new_session(),
            Err(ChunkError::SessionAlreadyOpen)
        ));
    }

    #[test]
    fn complete_on_empty_manager_is_none() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());
        assert!(mgr.complete_current_chunk().unwrap().is_none());
    }

    #[test]
    fn chunk_numbers_increase_within_one_session() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        let first = mgr.start_new_session().unwrap();
        touch(&first.path);
        let done1 = mgr.complete_current_chunk().unwrap().unwrap();

        let second = mgr.start_next_chunk().unwrap();
        touch(&second.path);
        let done2 = mgr.complete_current_chunk().unwrap().unwrap();

        assert_eq!(done1.chunk_number, 1);
        assert_eq!(done2.chunk_number, 2);
        assert_eq!(done1.session_id, done2.session_id);
        assert!(done1.ended_at >= done1.started_at);
    }

    #[test]
    fn session_identities_differ_across_sessions() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        let a = mgr.start_new_session().unwrap();
        touch(&a.path);
        mgr.end_session().unwrap();

        let b = mgr.start_new_session().unwrap();
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn finalize_renames_to_timestamp_name() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        let desc = mgr.start_new_session().unwrap();
        touch(&desc.path);
        let done = mgr.complete_current_chunk().unwrap().unwrap();

        assert!(!desc.path.exists());
        assert!(done.path.exists());
        let name = done.path.file_name().unwrap().to_str().unwrap();
        assert!(matches!(
            chunk::classify(name),
            Some(chunk::SegmentKind::Finalized { .. })
        ));
    }

    #[test]
    fn back_to_back_sessions_keep_distinct_finalized_files() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        // Both sessions start and finalize within the same wall-clock
        // second; neither rename may land on the other's file.
        let a = mgr.start_new_session().unwrap();
        std::fs::write(&a.path, b"first").unwrap();
        let done_a = mgr.end_session().unwrap().unwrap();

        let b = mgr.start_new_session().unwrap();
        std::fs::write(&b.path, b"second").unwrap();
        let done_b = mgr.end_session().unwrap().unwrap();

        assert_ne!(done_a.path, done_b.path);
        assert_eq!(std::fs::read(&done_a.path).unwrap(), b"first");
        assert_eq!(std::fs::read(&done_b.path).unwrap(), b"second");
    }

    #[test]
    fn finalize_failure_keeps_chunk_open() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        // No file behind the descriptor, so the rename must fail
        mgr.start_new_session().unwrap();
        assert!(mgr.complete_current_chunk().is_err());
        assert!(mgr.current().is_some());
    }

    #[test]
    fn end_session_completes_and_clears() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        let desc = mgr.start_new_session().unwrap();
        touch(&desc.path);
        let done = mgr.end_session().unwrap();

        assert_eq!(done.map(|c| c.chunk_number), Some(1));
        assert!(!mgr.is_session_open());
        assert_eq!(mgr.current_chunk_number(), 0);

        mgr.reset();
        assert_eq!(mgr.current_chunk_number(), 0);
    }

    #[test]
    fn start_next_chunk_requires_session_and_completed_current() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        assert!(matches!(mgr.start_next_chunk(), Err(ChunkError::NoSession)));

        mgr.start_new_session().unwrap();
        assert!(matches!(
            mgr.start_next_chunk(),
            Err(ChunkError::ChunkStillOpen)
        ));
    }

    #[test]
    fn completed_events_buffer_without_a_consumer() {
        let dir = tempdir().unwrap();
        let mut mgr = manager(dir.path());

        let n = 5;
        let desc = mgr.start_new_session().unwrap();
        touch(&desc.path);
        mgr.complete_current_chunk().unwrap();
        for _ in 1..n {
            let desc = mgr.start_next_chunk().unwrap();
            touch(&desc.path);
            mgr.complete_current_chunk().unwrap();
        }

        // Attach after the fact and drain everything, in emission order
        let mut rx = mgr.take_completed().expect("receiver still available");
        let mut seen = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            seen.push(chunk.chunk_number);
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert!(mgr.take_completed().is_none());
    }
}
