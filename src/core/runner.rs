//! # Run a single runner body.
//!
//! Executes one [`Runner`] inside the panic boundary and publishes its
//! lifecycle events to the [`Bus`].
//!
//! ## Event flow
//! ```text
//! Success:  publish RunnerStarting → runner.run() → Ok(())  → publish RunnerStopped
//! Failure:  publish RunnerStarting → runner.run() → Err(e)  → publish RunnerFailed
//! Panic:    publish RunnerStarting → runner.run() → panic   → publish RunnerFailed
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event.
//! - A panic never escapes; it becomes [`LifecycleError::RunnerPanicked`].

use crate::{
    core::boundary::{Fault, contain},
    error::LifecycleError,
    events::{Bus, Event, EventKind},
    tasks::Runner,
};

/// Runs `runner` to completion, converting errors and panics to [`LifecycleError`].
pub(crate) async fn run_runner<R: Runner + ?Sized>(
    runner: &R,
    bus: &Bus,
) -> Result<(), LifecycleError> {
    let name = runner.name();
    bus.publish(Event::new(EventKind::RunnerStarting).with_subject(name));

    let err = match contain(async { runner.run().await }).await {
        Ok(()) => {
            bus.publish(Event::new(EventKind::RunnerStopped).with_subject(name));
            return Ok(());
        }
        Err(Fault::Error(error)) => LifecycleError::RunnerFailed {
            runner: name.to_string(),
            error,
        },
        Err(Fault::Panic(info)) => LifecycleError::RunnerPanicked {
            runner: name.to_string(),
            info,
        },
    };

    bus.publish(
        Event::new(EventKind::RunnerFailed)
            .with_subject(name)
            .with_error(err.to_string()),
    );
    Err(err)
}
