//! Session orchestration
//!
//! Drives the external encoder and the ChunkManager through one recording
//! session: Idle -> Recording <-> Paused -> Stopped. Operations invoked from
//! the wrong state do nothing rather than fail; callers poll `state()`.

use super::chunk::CompletedChunk;
use super::chunk_manager::ChunkManager;
use super::state::{RecorderConfig, RecorderState};
use super::timer::PeriodicTask;
use crate::capture::{AudioRecorder, RecordingQuality, WakeGuard, WakeLock};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Events emitted during recording
///
/// A lossy notification stream for observers (UI, logging); the lossless
/// completed-chunk stream lives on the ChunkManager.
#[derive(Debug, Clone)]
pub enum RecordingEvent {
    Started,
    Stopped,
    Paused,
    Resumed,
    /// Rotation finished; the new chunk's number
    ChunkRotated(u32),
    Error(String),
    /// Elapsed recording time in seconds, once per second while recording
    Progress(u64),
}

/// Summary of a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub chunk_count: u32,
    pub elapsed_seconds: u64,
}

/// Orchestrates one recording session at a time
///
/// Cheap to clone through its internal `Arc`; the rotation timer holds only
/// a weak reference, so dropping every handle tears the session down.
pub struct SessionOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    config: RwLock<RecorderConfig>,
    state: RwLock<RecorderState>,
    /// Serializes start/pause/resume/stop/rotate; the single-writer
    /// discipline over the current chunk hangs off this lock
    transition: tokio::sync::Mutex<()>,
    chunks: tokio::sync::Mutex<ChunkManager>,
    recorder: tokio::sync::Mutex<Box<dyn AudioRecorder>>,
    wake_lock: Arc<dyn WakeLock>,
    wake_guard: Mutex<Option<WakeGuard>>,
    duration_tick: Mutex<Option<PeriodicTask>>,
    elapsed_secs: Arc<AtomicU64>,
    event_tx: broadcast::Sender<RecordingEvent>,
    last_error: Mutex<Option<String>>,
}

impl SessionOrchestrator {
    pub fn new(
        recorder: Box<dyn AudioRecorder>,
        wake_lock: Arc<dyn WakeLock>,
        config: RecorderConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let mut chunks = ChunkManager::new(config.output_dir.clone());
        chunks.configure(&config.output_dir, config.chunk_duration_minutes);

        Self {
            inner: Arc::new(Inner {
                config: RwLock::new(config),
                state: RwLock::new(RecorderState::Idle),
                transition: tokio::sync::Mutex::new(()),
                chunks: tokio::sync::Mutex::new(chunks),
                recorder: tokio::sync::Mutex::new(recorder),
                wake_lock,
                wake_guard: Mutex::new(None),
                duration_tick: Mutex::new(None),
                elapsed_secs: Arc::new(AtomicU64::new(0)),
                event_tx,
                last_error: Mutex::new(None),
            }),
        }
    }

    /// Start a new session; legal from Idle/Stopped, a no-op otherwise
    pub async fn start(&self, quality: RecordingQuality, chunk_duration_minutes: u64) {
        let inner = &self.inner;
        let _transition = inner.transition.lock().await;

        let state = *inner.state.read();
        if state != RecorderState::Idle && state != RecorderState::Stopped {
            tracing::debug!(?state, "start ignored");
            return;
        }

        let output_dir = inner.config.read().output_dir.clone();
        let descriptor = {
            let mut chunks = inner.chunks.lock().await;
            chunks.configure(&output_dir, chunk_duration_minutes);
            match chunks.start_new_session() {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    inner.note_error(format!("failed to open session: {e}"));
                    return;
                }
            }
        };

        tracing::info!(
            session = %descriptor.session_id,
            file = %descriptor.path.display(),
            "starting recording"
        );

        if let Err(e) = inner
            .recorder
            .lock()
            .await
            .start(&descriptor.path, quality)
            .await
        {
            // The failed attempt must leave no dangling open segment
            inner.chunks.lock().await.reset();
            *inner.state.write() = RecorderState::Idle;
            inner.note_error(format!("encoder start failed: {e}"));
            return;
        }

        inner.config.write().quality = quality;
        *inner.wake_guard.lock() = Some(WakeGuard::acquire(inner.wake_lock.clone()));
        inner.elapsed_secs.store(0, Ordering::SeqCst);
        inner.start_duration_tick();
        Inner::start_rotation_timer(inner).await;

        *inner.state.write() = RecorderState::Recording;
        let _ = inner.event_tx.send(RecordingEvent::Started);
    }

    /// Pause the session; legal from Recording only
    pub async fn pause(&self) {
        let inner = &self.inner;
        let _transition = inner.transition.lock().await;

        if *inner.state.read() != RecorderState::Recording {
            tracing::debug!(state = ?*inner.state.read(), "pause ignored");
            return;
        }

        if let Err(e) = inner.recorder.lock().await.pause().await {
            inner.note_error(format!("encoder pause failed: {e}"));
            return;
        }

        // Rotation must not fire while paused, and paused time must not
        // count toward the next deadline; resume restarts the timer fresh
        inner.stop_duration_tick();
        inner.chunks.lock().await.stop_chunk_timer();

        *inner.state.write() = RecorderState::Paused;
        let _ = inner.event_tx.send(RecordingEvent::Paused);
        tracing::info!("recording paused");
    }

    /// Resume a paused session; legal from Paused only
    pub async fn resume(&self) {
        let inner = &self.inner;
        let _transition = inner.transition.lock().await;

        if *inner.state.read() != RecorderState::Paused {
            tracing::debug!(state = ?*inner.state.read(), "resume ignored");
            return;
        }

        if let Err(e) = inner.recorder.lock().await.resume().await {
            inner.note_error(format!("encoder resume failed: {e}"));
            return;
        }

        inner.start_duration_tick();
        Inner::start_rotation_timer(inner).await;

        *inner.state.write() = RecorderState::Recording;
        let _ = inner.event_tx.send(RecordingEvent::Resumed);
        tracing::info!("recording resumed");
    }

    /// End the session; legal from Recording/Paused, a no-op otherwise
    pub async fn stop(&self) -> Option<SessionSummary> {
        let inner = &self.inner;
        let _transition = inner.transition.lock().await;

        let state = *inner.state.read();
        if state != RecorderState::Recording && state != RecorderState::Paused {
            tracing::debug!(?state, "stop ignored");
            return None;
        }

        inner.stop_duration_tick();

        if let Err(e) = inner.recorder.lock().await.stop().await {
            inner.note_error(format!("encoder stop failed: {e}"));
        }

        let (session_id, chunk_count) = {
            let mut chunks = inner.chunks.lock().await;
            let session_id = chunks.session_id().unwrap_or_default().to_string();
            let chunk_count = chunks.current_chunk_number();
            if let Err(e) = chunks.end_session() {
                inner.note_error(format!("failed to finalize last chunk: {e}"));
                chunks.reset();
            }
            (session_id, chunk_count)
        };

        inner.finish_stopped();
        tracing::info!(session = %session_id, chunks = chunk_count, "recording stopped");

        Some(SessionSummary {
            session_id,
            chunk_count,
            elapsed_seconds: inner.elapsed_secs.load(Ordering::SeqCst),
        })
    }

    pub fn state(&self) -> RecorderState {
        *self.inner.state.read()
    }

    /// Elapsed recording time in whole seconds (paused time excluded)
    pub fn elapsed_seconds(&self) -> u64 {
        self.inner.elapsed_secs.load(Ordering::SeqCst)
    }

    /// Most recent absorbed failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().clone()
    }

    /// Subscribe to the lossy notification stream
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Take the lossless completed-chunk receiver; available once
    pub async fn take_completed(&self) -> Option<mpsc::UnboundedReceiver<CompletedChunk>> {
        self.inner.chunks.lock().await.take_completed()
    }

    pub async fn session_id(&self) -> Option<String> {
        self.inner.chunks.lock().await.session_id().map(String::from)
    }
}

impl Clone for SessionOrchestrator {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Inner {
    fn note_error(&self, message: String) {
        tracing::warn!("{message}");
        *self.last_error.lock() = Some(message.clone());
        let _ = self.event_tx.send(RecordingEvent::Error(message));
    }

    fn start_duration_tick(&self) {
        let elapsed = self.elapsed_secs.clone();
        let event_tx = self.event_tx.clone();
        let task = PeriodicTask::spawn("duration", Duration::from_secs(1), move || {
            let elapsed = elapsed.clone();
            let event_tx = event_tx.clone();
            async move {
                let secs = elapsed.fetch_add(1, Ordering::SeqCst) + 1;
                let _ = event_tx.send(RecordingEvent::Progress(secs));
            }
        });
        *self.duration_tick.lock() = Some(task);
    }

    fn stop_duration_tick(&self) {
        if let Some(task) = self.duration_tick.lock().take() {
            task.stop();
        }
    }

    async fn start_rotation_timer(inner: &Arc<Self>) {
        let weak: Weak<Inner> = Arc::downgrade(inner);
        inner.chunks.lock().await.start_chunk_timer(move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    Inner::rotate(&inner).await;
                }
            }
        });
    }

    /// Timer-triggered rotation: stop encoder, finalize chunk, start the
    /// encoder on the next chunk's file
    ///
    /// A failure to start the next encoder ends the whole session; a stuck
    /// Recording state with no active writer is worse than losing the rest
    /// of the session.
    async fn rotate(inner: &Arc<Self>) {
        let _transition = inner.transition.lock().await;

        // A pause or stop may have won the race against this tick
        if *inner.state.read() != RecorderState::Recording {
            tracing::debug!("rotation tick after leaving Recording, skipped");
            return;
        }

        if let Err(e) = inner.recorder.lock().await.stop().await {
            inner.note_error(format!("encoder stop failed during rotation: {e}"));
            inner.abort_session().await;
            return;
        }

        let next = {
            let mut chunks = inner.chunks.lock().await;
            match chunks.complete_current_chunk() {
                Ok(Some(done)) => {
                    tracing::debug!(chunk = done.chunk_number, "rotated out chunk");
                }
                Ok(None) => tracing::warn!("rotation tick with no open chunk"),
                Err(e) => tracing::warn!("failed to finalize chunk during rotation: {e}"),
            }
            chunks.start_next_chunk()
        };

        let descriptor = match next {
            Ok(descriptor) => descriptor,
            Err(e) => {
                inner.note_error(format!("failed to allocate next chunk: {e}"));
                inner.abort_session().await;
                return;
            }
        };

        let quality = inner.config.read().quality;
        if let Err(e) = inner
            .recorder
            .lock()
            .await
            .start(&descriptor.path, quality)
            .await
        {
            inner.note_error(format!("encoder restart failed during rotation: {e}"));
            inner.abort_session().await;
            return;
        }

        let _ = inner
            .event_tx
            .send(RecordingEvent::ChunkRotated(descriptor.chunk_number));
    }

    /// Tear the session down from inside a failed rotation; transition lock
    /// already held
    async fn abort_session(&self) {
        self.chunks.lock().await.reset();
        self.finish_stopped();
        tracing::warn!("session aborted");
    }

    fn finish_stopped(&self) {
        self.stop_duration_tick();
        // Dropping the guard releases the wake lock
        self.wake_guard.lock().take();
        *self.state.write() = RecorderState::Stopped;
        let _ = self.event_tx.send(RecordingEvent::Stopped);
    }
}
