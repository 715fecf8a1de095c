//! Stop token for cooperative cancellation of actors and flows.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::warn;

/// A callback type for stop notifications.
pub type StopCallback = Box<dyn Fn() + Send + Sync>;

/// A thread-safe, cooperative stop signal.
///
/// Stopping is idempotent: only the first reason is kept. Waiters blocked in
/// [`stopped`](Self::stopped) are released immediately.
#[derive(Default)]
pub struct StopToken {
    stopped: AtomicBool,
    reason: RwLock<Option<String>>,
    callbacks: RwLock<Vec<StopCallback>>,
    notify: Notify,
}

impl StopToken {
    /// Creates a new token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop with a reason.
    ///
    /// Callbacks run on the calling thread. Panicking callbacks are logged
    /// and suppressed.
    pub fn stop(&self, reason: impl Into<String>) {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
            self.notify.notify_waiters();

            let callbacks = self.callbacks.read();
            for callback in callbacks.iter() {
                if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    callback();
                })) {
                    warn!("Stop callback panicked: {:?}", e);
                }
            }
        }
    }

    /// Registers a callback to run when the token is stopped.
    ///
    /// If already stopped, the callback runs immediately.
    pub fn on_stop<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.is_stopped() {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback();
            })) {
                warn!("Stop callback panicked: {:?}", e);
            }
        } else {
            self.callbacks.write().push(Box::new(callback));
        }
    }

    /// Returns whether a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Returns the stop reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Completes once the token is stopped.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }

    /// Clears the stop flag, reason and callbacks, ready for a new run.
    pub fn reset(&self) {
        self.stopped.store(false, Ordering::SeqCst);
        *self.reason.write() = None;
        self.callbacks.write().clear();
    }
}

impl std::fmt::Debug for StopToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopToken")
            .field("stopped", &self.is_stopped())
            .field("reason", &self.reason())
            .finish()
    }
}
