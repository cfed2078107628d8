//! Lifecycle core: the run/shutdown/exit-code state machine.
//!
//! The public API from this module is [`Lifecycle`], its [`LifecycleBuilder`],
//! [`Config`], [`ExitCode`] and [`ShutdownTrigger`].
//!
//! Internal modules:
//! - [`lifecycle`]: start sequence, failure watcher, exactly-once teardown;
//! - [`runner`]: runs one runner body and publishes its events;
//! - [`closer`]: runs closers in reverse order during teardown;
//! - [`boundary`]: panic containment shared by runners and closers;
//! - [`exit`]: exit code and its set-once latch;
//! - [`alive`]: names of runners still executing.

mod alive;
mod boundary;
mod builder;
mod closer;
mod config;
mod exit;
mod lifecycle;
mod runner;
mod trigger;

pub(crate) use boundary::panic_message;
pub use builder::LifecycleBuilder;
pub use config::Config;
pub use exit::ExitCode;
pub use lifecycle::Lifecycle;
pub use trigger::ShutdownTrigger;
