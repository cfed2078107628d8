//! # Event subscriber trait.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::SubscriberPanicked`)
//!
//! ## Overflow behavior
//! 1) The new event is **dropped** for this subscriber only.
//! 2) The lifecycle publishes `EventKind::SubscriberOverflow`.
//! 3) Other subscribers are unaffected.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use runvisor::{Event, EventKind, Subscribe};
//!
//! struct Alerts;
//!
//! #[async_trait]
//! impl Subscribe for Alerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::RunnerFailed) {
//!             // page someone...
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "alerts" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for lifecycle observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing affects only this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity (clamped to a minimum of 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
