//! Centralized shutdown management

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::constants::SHUTDOWN_TIMEOUT_SECS;

/// Coordinates graceful shutdown: a watch channel every worker loop selects
/// on, plus a registry of task handles awaited with a bounded grace period.
#[derive(Clone)]
pub struct ShutdownService {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl ShutdownService {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Track a background task so `shutdown` waits for it
    pub async fn register(&self, handle: JoinHandle<()>) {
        self.handles.lock().await.push(handle);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Flip the signal and drain the registered tasks. Workers notice the
    /// signal within one of their intervals; anything slower than the grace
    /// period is abandoned with a warning.
    pub async fn shutdown(&self) {
        self.trigger();

        let tasks = std::mem::take(&mut *self.handles.lock().await);
        tracing::debug!(tasks = tasks.len(), "shutting down, draining tasks");

        let grace = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        if tokio::time::timeout(grace, futures::future::join_all(tasks))
            .await
            .is_err()
        {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "some background tasks did not finish before the deadline"
            );
        } else {
            tracing::debug!("all background tasks finished");
        }
    }

    /// Owned future resolving once the signal flips (for axum's graceful
    /// shutdown)
    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.rx.clone();
        async move {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Trigger on Ctrl+C or SIGTERM
    pub fn install_signal_handlers(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let signal = wait_for_termination_signal().await;
            tracing::info!(signal, "termination signal, shutting down");
            this.trigger();
        });
    }
}

async fn wait_for_termination_signal() -> &'static str {
    let interrupt = async {
        tokio::signal::ctrl_c()
            .await
            .expect("ctrl-c handler installation failed");
    };

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("sigterm handler installation failed");

        tokio::select! {
            _ = interrupt => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        interrupt.await;
        "ctrl-c"
    }
}

impl Default for ShutdownService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_starts_low_and_latches() {
        let shutdown = ShutdownService::new();
        assert!(!shutdown.is_triggered());

        shutdown.trigger();
        assert!(shutdown.is_triggered());

        // A second trigger is a no-op
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let shutdown = ShutdownService::new();
        let waiting = tokio::spawn(shutdown.wait());

        tokio::task::yield_now().await;
        shutdown.trigger();

        tokio::time::timeout(Duration::from_millis(100), waiting)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_resolves_immediately_when_already_triggered() {
        let shutdown = ShutdownService::new();
        shutdown.trigger();

        tokio::time::timeout(Duration::from_millis(100), shutdown.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscribers_observe_the_flip() {
        let shutdown = ShutdownService::new();
        let rx = shutdown.subscribe();

        assert!(!*rx.borrow());
        shutdown.trigger();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_shutdown_drains_registered_tasks() {
        let shutdown = ShutdownService::new();
        let mut rx = shutdown.subscribe();

        shutdown
            .register(tokio::spawn(async move {
                let _ = rx.wait_for(|&flipped| flipped).await;
            }))
            .await;

        tokio::time::timeout(Duration::from_secs(1), shutdown.shutdown())
            .await
            .unwrap();
    }
}
