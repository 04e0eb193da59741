//! One-shot refresh timer
//!
//! At most one timer is armed at a time: arming aborts the previous one
//! first. When a timer fires it detaches itself from the slot before running
//! its task, so a task that re-arms the scheduler never aborts itself.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Delay until the refresh should run
///
/// `max(0, (expires_at - now) - leeway)` seconds. Already expired tokens
/// refresh immediately.
pub fn refresh_delay(expires_at: i64, now: i64, leeway_secs: i64) -> Duration {
    let secs = expires_at.saturating_sub(now).saturating_sub(leeway_secs).max(0);
    Duration::from_secs(u64::try_from(secs).unwrap_or(0))
}

struct ArmedTimer {
    id: u64,
    handle: JoinHandle<()>,
}

/// Owner of the single pending refresh timer
#[derive(Default)]
pub struct RefreshScheduler {
    slot: Arc<Mutex<Option<ArmedTimer>>>,
    next_id: AtomicU64,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer running `task` after `delay`, cancelling any prior timer
    ///
    /// Returns `false` when called outside a Tokio runtime; nothing is armed
    /// in that case.
    pub fn arm<F>(&self, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime available, refresh timer not armed");
            return false;
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::clone(&self.slot);

        let mut guard = self.slot.lock();
        if let Some(previous) = guard.take() {
            previous.handle.abort();
            debug!(timer_id = previous.id, "Cancelled previous refresh timer");
        }

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut guard = slot.lock();
                if guard.as_ref().is_some_and(|armed| armed.id == id) {
                    // Dropping the handle detaches this task
                    guard.take();
                }
            }
            task.await;
        });
        *guard = Some(ArmedTimer { id, handle });
        drop(guard);

        debug!(timer_id = id, delay_secs = delay.as_secs(), "Armed refresh timer");
        true
    }

    /// Cancel the pending timer, if any. Idempotent.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().take() {
            Some(armed) => {
                armed.handle.abort();
                debug!(timer_id = armed.id, "Cancelled refresh timer");
                true
            }
            None => false,
        }
    }

    /// Whether a timer is armed and has not fired yet
    pub fn is_armed(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|armed| !armed.handle.is_finished())
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(armed) = self.slot.lock().take() {
            armed.handle.abort();
        }
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler").field("armed", &self.is_armed()).finish()
    }
}
