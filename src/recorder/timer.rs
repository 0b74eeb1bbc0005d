//! Cancellable periodic task
//!
//! Shared primitive behind the rotation timer and the 1-second duration
//! tick. Each instance is an independent tokio task, so a panic in one
//! tick callback cannot take the other timers down with it.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// A periodic background task that can be stopped at any time
///
/// Stopping is idempotent and never interrupts a tick that is already
/// executing; the in-flight tick completes and no further ticks fire.
pub struct PeriodicTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn a task invoking `tick` every `period`, first tick after one
    /// full period
    pub fn spawn<F, Fut>(label: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (cancel, mut cancelled) = watch::channel(false);

        // Anchor the first deadline here, not inside the task: the spawned
        // future may not be polled until after the caller has moved on, and
        // the period must count from the moment the timer was requested.
        let first_tick = Instant::now() + period;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.changed() => break,
                    _ = interval.tick() => tick().await,
                }
            }
            tracing::debug!("{} timer stopped", label);
        });

        Self { cancel, handle }
    }

    /// Request the task to stop; safe to call repeatedly
    pub fn stop(&self) {
        // Send fails only if the task already exited, which is fine
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn ticks_repeatedly_until_stopped() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let task = PeriodicTask::spawn("test", Duration::from_millis(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(55)).await;
        task.stop();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected repeated ticks, saw {seen}");

        let after_stop = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let task = PeriodicTask::spawn("test", Duration::from_secs(60), || async {});
        task.stop();
        task.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn first_deadline_counts_from_spawn_not_first_poll() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let _task = PeriodicTask::spawn("test", Duration::from_secs(300), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Advance past one period before the spawned task has ever been
        // polled; the deadline must already be in the past when it is.
        tokio::time::advance(Duration::from_secs(301)).await;
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_tick_before_first_period() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let _task = PeriodicTask::spawn("test", Duration::from_secs(60), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
