//! # Event subscribers.
//!
//! Provides the [`Subscribe`] extension point, the [`SubscriberSet`] fan-out and
//! the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Lifecycle ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet::emit()
//!                                                                     │
//!                                                     ┌───────────────┼───────────────┐
//!                                                     ▼               ▼               ▼
//!                                                 LogWriter        Metrics         Custom
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
