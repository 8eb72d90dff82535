use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Cooperative stop signal shared by the engine, its workers and the sources
///
/// Once triggered it stays triggered for the rest of the run.
#[derive(Debug, Default)]
pub struct Shutdown {
    triggered: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop and wakes everything waiting on it
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested
    pub async fn triggered(&self) {
        loop {
            // Register before checking the flag so a concurrent trigger is not missed
            let notified = self.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }

    /// Sleeps for `duration` unless a stop arrives first
    ///
    /// Returns false when the pause was cut short.
    pub async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return !self.is_triggered();
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.triggered() => false,
        }
    }
}
