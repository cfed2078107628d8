//! # Events emitted by the lifecycle.
//!
//! The [`EventKind`] enum classifies events across four groups:
//! - **Start events**: runner launched, all runners launched, missing closers
//! - **Runner events**: runner returned cleanly or failed
//! - **Shutdown events**: teardown begun, closer progress, drain, completion
//! - **Subscriber events**: overflow and panic inside subscriber workers
//!
//! The [`Event`] struct carries metadata such as timestamp, subject name
//! (runner, closer or subscriber), error text and exit code.
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore order across subscribers.
//!
//! ## Example
//! ```rust
//! use runvisor::{Event, EventKind, ExitCode};
//!
//! let ev = Event::new(EventKind::Completed).with_code(ExitCode::Failure);
//! assert_eq!(ev.code, Some(ExitCode::Failure));
//!
//! let ev = Event::new(EventKind::RunnerFailed)
//!     .with_subject("consumer")
//!     .with_error("connection reset");
//! assert_eq!(ev.subject.as_deref(), Some("consumer"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::ExitCode;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Start events ===
    /// A runner unit began executing.
    ///
    /// Sets `subject` (runner name).
    RunnerStarting,

    /// Every runner has begun; `wait_started` is released.
    AllStarted,

    /// `start` found no closers registered (advisory).
    NoClosers,

    // === Runner events ===
    /// Runner returned `Ok(())`.
    ///
    /// Sets `subject`.
    RunnerStopped,

    /// Runner returned an error or panicked.
    ///
    /// Sets `subject`, `error`.
    RunnerFailed,

    // === Shutdown events ===
    /// Teardown began.
    ///
    /// Sets `reason`: `runner_failed`, `triggered` or `requested`.
    ShutdownRequested,

    /// A closer is about to run.
    ///
    /// Sets `subject` (closer name).
    CloserStarting,

    /// A closer returned `Ok(())`.
    ///
    /// Sets `subject`.
    CloserDone,

    /// A closer returned an error or panicked.
    ///
    /// Sets `subject`, `error`.
    CloserFailed,

    /// Teardown is still waiting for runners to return.
    ///
    /// Sets `reason` (comma-separated runner names).
    StragglersPending,

    /// Every runner has returned.
    RunnersDrained,

    /// Final exit code published.
    ///
    /// Sets `code`.
    Completed,

    /// A late `shutdown` call found no listener waiting on completion (advisory).
    ///
    /// Sets `code`.
    CompletionUnobserved,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `subject` (subscriber name), `error` (panic info).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `subject` (subscriber name), `reason`.
    SubscriberOverflow,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Runner, closer or subscriber the event is about.
    pub subject: Option<Arc<str>>,
    /// Error text for failure events.
    pub error: Option<Arc<str>>,
    /// Free-form reason (shutdown cause, overflow details, pending runners).
    pub reason: Option<Arc<str>>,
    /// Exit code for completion events.
    pub code: Option<ExitCode>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subject: None,
            error: None,
            reason: None,
            code: None,
        }
    }

    /// Attaches the runner/closer/subscriber name.
    #[inline]
    pub fn with_subject(mut self, subject: impl Into<Arc<str>>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attaches error text.
    #[inline]
    pub fn with_error(mut self, error: impl Into<Arc<str>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches a reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an exit code.
    #[inline]
    pub fn with_code(mut self, code: ExitCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_subject(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_subject(subscriber)
            .with_error(info)
    }

    /// Returns `true` for events describing a failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::RunnerFailed | EventKind::CloserFailed | EventKind::SubscriberPanicked
        )
    }
}
