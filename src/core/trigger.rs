//! # External shutdown trigger.
//!
//! A [`ShutdownTrigger`] lets code without access to the `Arc<Lifecycle>`
//! (signal adapters, runner closures, admin endpoints) ask for shutdown. Once
//! the lifecycle is started its watcher observes the trigger and runs the
//! teardown; firing before `start` takes effect as soon as `start` completes.

use tokio_util::sync::CancellationToken;

/// Clonable handle requesting lifecycle shutdown.
#[derive(Clone, Debug)]
pub struct ShutdownTrigger {
    token: CancellationToken,
}

impl ShutdownTrigger {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Requests shutdown. Idempotent.
    pub fn fire(&self) {
        self.token.cancel();
    }

    /// Returns `true` once any clone has fired.
    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once any clone has fired.
    pub async fn fired(&self) {
        self.token.cancelled().await;
    }
}
