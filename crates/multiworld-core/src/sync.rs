//! Periodic outbound sync.
//!
//! The [`SyncLoop`] runs one push pass immediately and then one every
//! interval until stopped. Stopping sets a [`CancelToken`] that the task
//! checks at the top of every iteration and races against its sleep; an
//! in-flight push is never aborted.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One-shot cancellation flag with async wake-up.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Create an uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and wake every waiter.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Wait until cancelled. Returns immediately if already cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

struct Running {
    token: Arc<CancelToken>,
    handle: JoinHandle<()>,
}

/// Background task pushing local state at a fixed interval.
pub struct SyncLoop {
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for SyncLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLoop")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl SyncLoop {
    /// Create a stopped loop.
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            running: Mutex::new(None),
        }
    }

    /// Whether a loop task is active.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|running| !running.token.is_cancelled() && !running.handle.is_finished())
    }

    /// Start the loop. Returns `false` without doing anything if it is
    /// already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F, Fut>(&self, pass: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running
            .as_ref()
            .is_some_and(|r| !r.token.is_cancelled() && !r.handle.is_finished())
        {
            debug!("Sync loop already running");
            return false;
        }

        let token = Arc::new(CancelToken::new());
        let task_token = Arc::clone(&token);
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            loop {
                if task_token.is_cancelled() {
                    break;
                }
                pass().await;
                tokio::select! {
                    () = tokio::time::sleep(interval) => {}
                    () = task_token.cancelled() => break,
                }
            }
            debug!("Sync loop exited");
        });
        info!(interval_secs = interval.as_secs(), "Sync loop started");
        *running = Some(Running { token, handle });
        true
    }

    /// Stop the loop. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let taken = self.running.lock().unwrap_or_else(PoisonError::into_inner).take();
        match taken {
            Some(running) if !running.token.is_cancelled() => {
                running.token.cancel();
                info!("Sync loop stopped");
                true
            }
            _ => false,
        }
    }
}

impl Drop for SyncLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    fn counting_pass(counter: &Arc<AtomicU32>) -> impl Fn() -> futures::future::Ready<()> + Send + Sync + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(())
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pushes_immediately_then_every_interval() {
        let counter = Arc::new(AtomicU32::new(0));
        let sync = SyncLoop::new(Duration::from_secs(60));
        assert!(sync.start(counting_pass(&counter)));
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        tokio::time::advance(Duration::from_secs(59)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(sync.stop());
    }

    #[tokio::test]
    async fn second_start_is_noop() {
        tokio::time::pause();
        let counter = Arc::new(AtomicU32::new(0));
        let sync = SyncLoop::new(Duration::from_secs(60));
        assert!(sync.start(counting_pass(&counter)));
        assert!(!sync.start(counting_pass(&counter)));
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(sync.is_running());
    }

    #[tokio::test]
    async fn stopped_loop_does_not_rearm() {
        tokio::time::pause();
        let counter = Arc::new(AtomicU32::new(0));
        let sync = SyncLoop::new(Duration::from_secs(60));
        sync.start(counting_pass(&counter));
        settle().await;
        assert!(sync.stop());
        assert!(!sync.stop());
        assert!(!sync.is_running());

        tokio::time::advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // A fresh start after stop is allowed.
        assert!(sync.start(counting_pass(&counter)));
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancel_token_wakes_waiters() {
        let token = Arc::new(CancelToken::new());
        let waiter = {
            let token = Arc::clone(&token);
            tokio::spawn(async move { token.cancelled().await })
        };
        settle().await;
        token.cancel();
        assert!(waiter.await.is_ok());
        // Already cancelled: returns immediately.
        token.cancelled().await;
    }
}
