//! # runvisor
//!
//! **Runvisor** coordinates the life of a long-running process: it starts a
//! set of concurrent workers (runners), watches them, and on the first
//! failure, signal or explicit request tears the process down exactly once
//! by running registered cleanup actions (closers) in reverse order. The
//! result is a single exit code for the process.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    Runner    │   │    Runner    │   │   signals    │
//!     │ (http loop)  │   │  (consumer)  │   │  (adapter)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Lifecycle                                                        │
//! │  - TaskTracker (runner units not yet returned)                    │
//! │  - error channel (one slot per runner)                            │
//! │  - ExitState (first code wins)                                    │
//! │  - completion (watch channel with the final code)                 │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        │ first error      │ trigger fired    │ shutdown() called
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  teardown (exactly once)                                          │
//! │  cancel shutdown token ─► closers N..1 ─► wait runners            │
//! │  ─► drain late errors ─► publish exit code                        │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                     Bus (broadcast) ─► SubscriberSet ─► LogWriter, ...
//! ```
//!
//! ### Exit code
//! ```text
//! runner Err / panic  ─┐
//! closer Err / panic  ─┼─► ExitCode::Failure  (first setter wins)
//! teardown finished   ─┴─► ExitCode::Success  (only if nothing failed)
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                       |
//! |-------------------|--------------------------------------------------------------|------------------------------------------|
//! | **Lifecycle**     | Start runners, tear down once, report one exit code.         | [`Lifecycle`], [`LifecycleBuilder`]      |
//! | **Work units**    | Runners and closers as trait objects or closures.            | [`Runner`], [`RunnerFn`], [`Closer`], [`CloserFn`] |
//! | **Signals**       | Shut down on SIGINT/SIGTERM/SIGQUIT/SIGHUP.                  | [`ShutdownSignal`], [`SignalSource`]     |
//! | **Subscriber API**| Observe lifecycle events (logging, metrics, custom).         | [`Subscribe`], [`LogWriter`]             |
//! | **Errors**        | Typed failures and API misuse errors.                        | [`LifecycleError`], [`RuntimeError`]     |
//! | **Configuration** | Bus capacity and straggler reporting.                        | [`Config`]                               |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use runvisor::{Config, ExitCode, Lifecycle, LogWriter, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::default())];
//!
//!     let builder = Lifecycle::builder(Config::default()).with_subscribers(subs);
//!     let stop = builder.shutdown_token();
//!
//!     let lifecycle = builder
//!         .runner("server", move || {
//!             let stop = stop.clone();
//!             async move {
//!                 stop.cancelled().await;
//!                 Ok(())
//!             }
//!         })
//!         .closer("db", || async { Ok(()) })
//!         .build();
//!
//!     lifecycle.start().await.unwrap();
//!     // ... serve ...
//!     let code = lifecycle.shutdown().await;
//!     assert_eq!(code, ExitCode::Success);
//! }
//! ```
mod core;
mod error;
mod events;
mod signals;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use core::{Config, ExitCode, Lifecycle, LifecycleBuilder, ShutdownTrigger};
pub use error::{LifecycleError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use signals::{DEFAULT_SIGNALS, OsSignals, ShutdownSignal, SignalSource};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Closer, CloserFn, CloserRef, Runner, RunnerFn, RunnerRef};
