//! Shutdown coordination for the host.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, watch};

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe to the trigger channel. Teardown is guarded
/// so that racing triggers (SIGINT and SIGTERM together, a panic during
/// shutdown, an admin call) run it exactly once, and a one-shot completion
/// signal lets late callers wait for the teardown another task is running.
pub struct ShutdownCoordinator {
    trigger_tx: broadcast::Sender<()>,
    triggered: AtomicBool,
    teardown_started: AtomicBool,
    done_tx: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (trigger_tx, _) = broadcast::channel(4);
        let (done_tx, _) = watch::channel(false);
        Self {
            trigger_tx,
            triggered: AtomicBool::new(false),
            teardown_started: AtomicBool::new(false),
            done_tx,
        }
    }

    /// Subscribe to the shutdown trigger.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.trigger_tx.subscribe()
    }

    /// Fire the shutdown trigger, recording its cause.
    ///
    /// Safe to call any number of times; only the first call logs at info.
    pub fn trigger(&self, cause: &str) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            tracing::info!(cause, "Shutdown triggered");
        } else {
            tracing::debug!(cause, "Shutdown already triggered");
        }
        let _ = self.trigger_tx.send(());
    }

    /// True once any trigger has fired.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Claim the right to run teardown.
    ///
    /// Returns true for exactly one caller per process; everyone else should
    /// wait on [`wait_complete`](Self::wait_complete) instead.
    pub fn begin_teardown(&self) -> bool {
        self.teardown_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Resolve the completion signal after teardown has finished.
    pub fn complete(&self) {
        let _ = self.done_tx.send(true);
    }

    /// Wait until teardown has completed.
    pub async fn wait_complete(&self) {
        let mut rx = self.done_tx.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
