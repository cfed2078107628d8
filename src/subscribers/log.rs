//! # LogWriter — forwards events to `tracing`
//!
//! Failures go out at `error`, advisories at `warn`, progress at `info` and
//! per-runner chatter at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG runvisor: runner starting runner="http"
//!  INFO runvisor: all runners started
//! ERROR runvisor: runner failed runner="http" error="bind: address in use"
//!  INFO runvisor: shutdown requested reason="runner_failed"
//!  INFO runvisor: lifecycle completed code=1
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber backed by `tracing`.
#[derive(Default, Debug)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let subject = e.subject.as_deref().unwrap_or("-");
        let error = e.error.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::RunnerStarting => {
                tracing::debug!(target: "runvisor", runner = subject, "runner starting");
            }
            EventKind::AllStarted => {
                tracing::info!(target: "runvisor", "all runners started");
            }
            EventKind::NoClosers => {
                tracing::warn!(target: "runvisor", "no closers registered");
            }
            EventKind::RunnerStopped => {
                tracing::debug!(target: "runvisor", runner = subject, "runner stopped");
            }
            EventKind::RunnerFailed => {
                tracing::error!(target: "runvisor", runner = subject, error, "runner failed");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "runvisor", reason, "shutdown requested");
            }
            EventKind::CloserStarting => {
                tracing::debug!(target: "runvisor", closer = subject, "closer starting");
            }
            EventKind::CloserDone => {
                tracing::debug!(target: "runvisor", closer = subject, "closer done");
            }
            EventKind::CloserFailed => {
                tracing::error!(target: "runvisor", closer = subject, error, "closer failed");
            }
            EventKind::StragglersPending => {
                tracing::warn!(target: "runvisor", pending = reason, "waiting for runners");
            }
            EventKind::RunnersDrained => {
                tracing::info!(target: "runvisor", "all runners returned");
            }
            EventKind::Completed => {
                tracing::info!(target: "runvisor", code = ?e.code, "lifecycle completed");
            }
            EventKind::CompletionUnobserved => {
                tracing::warn!(target: "runvisor", code = ?e.code, "completion not observed");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "runvisor", subscriber = subject, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "runvisor", subscriber = subject, info = error, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
