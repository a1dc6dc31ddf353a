use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Resolution of the quiz clock.
pub const TICK: Duration = Duration::from_secs(1);

/// Counts whole seconds on a background task while a quiz runs.
///
/// Stopping aborts the task and freezes the count, so no tick can land after
/// [`QuizTimer::stop`] returns. Dropping a running timer aborts it too.
#[derive(Debug)]
pub struct QuizTimer {
    elapsed: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
    frozen: Option<u64>,
}

impl QuizTimer {
    /// Spawn the ticking task. Must be called from within a tokio runtime.
    #[must_use]
    pub fn start() -> Self {
        let elapsed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&elapsed);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        Self {
            elapsed,
            handle: Some(handle),
            frozen: None,
        }
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u64 {
        self.frozen
            .unwrap_or_else(|| self.elapsed.load(Ordering::Relaxed))
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancel ticking and return the final count. Idempotent.
    pub fn stop(&mut self) -> u64 {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            self.frozen = Some(self.elapsed.load(Ordering::Relaxed));
        }
        self.elapsed_secs()
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
