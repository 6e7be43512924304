use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Notify, Semaphore};

/// Limits concurrency and supports temporarily pausing work dispatch.
///
/// This is the explicit rate-limit object passed into every external-call
/// site; each provider's request quota is shared across all in-flight
/// work rather than split per task. Wrap in an `Arc` via [`Throttler::new`],
/// then call [`Throttler::acquire`] before each unit of work. At most
/// `max_concurrent` tasks run simultaneously. Any task can call
/// [`Throttler::pause_for`] when a provider reports an exhausted quota, which
/// halts dispatch for everyone until the reported reset.
///
/// When multiple tasks call [`Throttler::pause_for`] concurrently, the
/// longest pause wins.
#[derive(Debug)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
    paused: AtomicBool,
    resume: Notify,
    /// When the current pause expires; ensures the longest of overlapping
    /// pauses wins.
    resume_at: std::sync::Mutex<Option<Instant>>,
}

impl Throttler {
    /// Minimum extension required for a new pause to override an active one,
    /// so near-simultaneous callers that discovered the same reset time don't
    /// each restart the pause.
    const MIN_PAUSE_EXTENSION: Duration = Duration::from_secs(1);

    /// Create a new throttler that allows at most `max_concurrent` tasks at a time.
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            paused: AtomicBool::new(false),
            resume: Notify::new(),
            resume_at: std::sync::Mutex::new(None),
        })
    }

    /// Wait until unpaused, then acquire a concurrency slot.
    ///
    /// The returned permit must be held for the duration of the work.
    pub async fn acquire(&self) -> tokio::sync::OwnedSemaphorePermit {
        loop {
            if self.paused.load(Ordering::Acquire) {
                self.resume.notified().await;
                continue;
            }

            return Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .expect("semaphore is never closed");
        }
    }

    /// Returns whether the throttler is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause dispatching for `duration`, then automatically resume.
    ///
    /// Tasks already running are not interrupted; tasks waiting in
    /// [`acquire`](Self::acquire) stay parked until the duration elapses. If
    /// an equivalent or longer pause is already active this is a no-op and
    /// returns `false`; `true` means a new pause was established.
    pub fn pause_for(self: &Arc<Self>, duration: Duration) -> bool {
        let new_resume_at = Instant::now() + duration;

        {
            let mut guard = self.resume_at.lock().expect("lock not poisoned");
            if guard.is_some_and(|existing| existing + Self::MIN_PAUSE_EXTENSION >= new_resume_at) {
                return false;
            }
            *guard = Some(new_resume_at);
        }

        self.paused.store(true, Ordering::Release);
        let this = Arc::clone(self);
        drop(tokio::spawn(async move {
            tokio::time::sleep(duration).await;

            let should_resume = {
                let mut guard = this.resume_at.lock().expect("lock not poisoned");
                if guard.is_some_and(|t| Instant::now() >= t) {
                    *guard = None;
                    true
                } else {
                    false // a longer pause was scheduled after us
                }
            };

            if should_resume {
                this.paused.store(false, Ordering::Release);
                this.resume.notify_waiters();
            }
        }));

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn limits_concurrency() {
        let throttler = Throttler::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let throttler = Arc::clone(&throttler);
                let active = Arc::clone(&active);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    let _permit = throttler.acquire().await;
                    let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                    _ = max_seen.fetch_max(current, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    _ = active.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        _ = futures_util::future::join_all(tasks).await;

        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn pause_blocks_new_work() {
        let throttler = Throttler::new(5);

        let _ = throttler.pause_for(Duration::from_millis(200));
        assert!(throttler.is_paused());

        let start = tokio::time::Instant::now();
        let _permit = throttler.acquire().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn shorter_overlapping_pause_is_ignored() {
        let throttler = Throttler::new(1);

        assert!(throttler.pause_for(Duration::from_secs(60)));
        assert!(!throttler.pause_for(Duration::from_secs(5)));
    }
}
