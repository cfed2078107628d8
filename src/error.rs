//! Error types used by the runvisor lifecycle.
//!
//! This module defines two enums:
//!
//! - [`LifecycleError`] — failures of runners and closers. These never reach the
//!   caller as values; they are logged, published on the event bus and folded
//!   into the final [`ExitCode`](crate::ExitCode).
//! - [`RuntimeError`] — misuse of the lifecycle API itself.
//!
//! Both types provide `as_label` for logs/metrics.

use thiserror::Error;

/// # Failures observed while running or closing.
///
/// Every variant fixes the exit state to failure the first time it is seen.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// A runner returned an error.
    #[error("runner {runner:?} failed: {error:#}")]
    RunnerFailed {
        /// Name of the runner.
        runner: String,
        /// The error returned by the runner body.
        error: anyhow::Error,
    },

    /// A runner panicked; the panic was contained at the runner boundary.
    #[error("runner {runner:?} panicked: {info}")]
    RunnerPanicked {
        /// Name of the runner.
        runner: String,
        /// Panic payload rendered as text.
        info: String,
    },

    /// A closer returned an error.
    #[error("closer {closer:?} failed: {error:#}")]
    CloserFailed {
        /// Name of the closer.
        closer: String,
        /// The error returned by the closer body.
        error: anyhow::Error,
    },

    /// A closer panicked; remaining closers still run.
    #[error("closer {closer:?} panicked: {info}")]
    CloserPanicked {
        /// Name of the closer.
        closer: String,
        /// Panic payload rendered as text.
        info: String,
    },
}

impl LifecycleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use runvisor::LifecycleError;
    ///
    /// let err = LifecycleError::RunnerPanicked { runner: "http".into(), info: "boom".into() };
    /// assert_eq!(err.as_label(), "runner_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::RunnerFailed { .. } => "runner_failed",
            LifecycleError::RunnerPanicked { .. } => "runner_panicked",
            LifecycleError::CloserFailed { .. } => "closer_failed",
            LifecycleError::CloserPanicked { .. } => "closer_panicked",
        }
    }

    /// Name of the runner or closer the error came from.
    pub fn source_name(&self) -> &str {
        match self {
            LifecycleError::RunnerFailed { runner, .. }
            | LifecycleError::RunnerPanicked { runner, .. } => runner,
            LifecycleError::CloserFailed { closer, .. }
            | LifecycleError::CloserPanicked { closer, .. } => closer,
        }
    }

    /// Returns `true` for errors raised by a panic rather than a returned `Err`.
    pub fn is_panic(&self) -> bool {
        matches!(
            self,
            LifecycleError::RunnerPanicked { .. } | LifecycleError::CloserPanicked { .. }
        )
    }
}

/// # Errors produced by misuse of the lifecycle API.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    /// `start` was called more than once.
    #[error("lifecycle already started")]
    AlreadyStarted,

    /// `start` was called after shutdown had begun.
    #[error("lifecycle is shutting down")]
    ShuttingDown,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use runvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::AlreadyStarted.as_label(), "runtime_already_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyStarted => "runtime_already_started",
            RuntimeError::ShuttingDown => "runtime_shutting_down",
        }
    }
}
