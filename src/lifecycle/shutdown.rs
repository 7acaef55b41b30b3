//! Stop signal for the wallet watcher and other long-running client tasks.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to every subscribed task.
///
/// Only the first `trigger` is delivered; later calls are no-ops.
pub struct Shutdown {
    notify: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            triggered: AtomicBool::new(false),
        }
    }

    /// Receiver handed to a task such as `LifelineClient::watch_wallet_events`.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.notify.subscribe()
    }

    /// Signal every listener. Returns false if already triggered.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return false;
        }
        let listeners = self.notify.send(()).unwrap_or(0);
        tracing::info!(listeners = listeners, "Stopping client tasks");
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Tasks still holding a receiver.
    pub fn listeners(&self) -> usize {
        self.notify.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_listeners() {
        let shutdown = Shutdown::new();
        let mut watcher = shutdown.subscribe();
        let mut other = shutdown.subscribe();
        assert_eq!(shutdown.listeners(), 2);

        assert!(shutdown.trigger());
        assert!(shutdown.is_triggered());
        assert!(watcher.recv().await.is_ok());
        assert!(other.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_second_trigger_is_ignored() {
        let shutdown = Shutdown::new();
        let mut watcher = shutdown.subscribe();

        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());
        assert!(watcher.recv().await.is_ok());
        assert!(watcher.try_recv().is_err());
    }

    #[test]
    fn test_trigger_without_listeners() {
        let shutdown = Shutdown::default();
        assert!(shutdown.trigger());
        assert_eq!(shutdown.listeners(), 0);
    }
}
