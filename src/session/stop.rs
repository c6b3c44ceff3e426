//! The `receive_stopped` / `receive_cancelled` signal pair from §9: two
//! separate one-way gates rather than one conflated flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

use crate::error::CdpError;

/// Set by `disconnect` to ask the receive loop to stop. Checked by the loop
/// after every 1-second read-deadline expiry.
#[derive(Default)]
pub struct CancelSignal {
    cancelled: AtomicBool,
}

impl CancelSignal {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Fact, not intent: the receive loop has returned. Set exactly once, on
/// the only path that exits the loop. Every blocked `send`/`subscribe`
/// caller races its wait against this gate.
#[derive(Default)]
pub struct StopSignal {
    notify: Notify,
    cause: OnceLock<Option<Arc<CdpError>>>,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        self.cause.get().is_some()
    }

    pub fn cause(&self) -> Option<Arc<CdpError>> {
        self.cause.get().cloned().flatten()
    }

    /// Sets the stop fact. `cause` is `None` for a clean disconnect, `Some`
    /// for a loop that died because the transport failed.
    pub fn stop(&self, cause: Option<CdpError>) {
        // OnceLock::set silently no-ops on a second call; receive_stopped
        // must be set exactly once, so only the first caller's cause wins.
        let _ = self.cause.set(cause.map(Arc::new));
        self.notify.notify_waiters();
    }

    /// Resolves once `stop` has been called. Race-free even if `stop`
    /// fires between the check and the `notified()` subscription.
    pub async fn wait(&self) {
        if self.is_stopped() {
            return;
        }
        let notified = self.notify.notified();
        if self.is_stopped() {
            return;
        }
        notified.await;
    }
}
</content>
