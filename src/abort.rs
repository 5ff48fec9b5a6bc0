//! Cooperative cancellation of settlement waits.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct AbortInner {
    aborted: AtomicBool,
    notify: Notify,
}

/// Requests cancellation of the work holding the matching [`AbortSignal`].
#[derive(Debug, Clone)]
pub struct AbortHandle {
    inner: Arc<AbortInner>,
}

impl AbortHandle {
    /// Creates a connected handle and signal pair.
    pub fn new() -> (Self, AbortSignal) {
        let inner = Arc::new(AbortInner::default());
        (Self { inner: inner.clone() }, AbortSignal { inner })
    }

    /// Requests cancellation. Idempotent.
    pub fn abort(&self) {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }
}

/// Observes cancellation requests from the matching [`AbortHandle`].
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    inner: Arc<AbortInner>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Whether cancellation has been requested.
    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Waits until cancellation is requested.
    pub async fn aborted(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag so a concurrent abort is not missed.
        notified.as_mut().enable();
        if self.is_aborted() {
            return;
        }
        notified.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn abort_wakes_waiters() {
        let (handle, signal) = AbortHandle::new();
        let waiter = tokio::spawn(async move { signal.aborted().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn abort_before_wait_returns_immediately() {
        let (handle, signal) = AbortHandle::new();
        handle.abort();
        assert!(signal.is_aborted());
        signal.aborted().await;
    }

    #[tokio::test]
    async fn never_signal_stays_quiet() {
        let signal = AbortSignal::never();
        assert!(!signal.is_aborted());
        let wait = tokio::time::timeout(Duration::from_millis(20), signal.aborted()).await;
        assert!(wait.is_err());
    }
}
