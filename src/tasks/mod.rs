//! # Runner and closer abstractions.
//!
//! This module provides the units of work the lifecycle drives:
//! - [`Runner`] - long-lived async worker, launched once at start
//! - [`RunnerFn`] - closure-backed runner
//! - [`Closer`] - async cleanup action, invoked once during shutdown
//! - [`CloserFn`] - closure-backed closer
//!
//! Both kinds are shared as `Arc<dyn _>` ([`RunnerRef`], [`CloserRef`]).

mod closer;
mod runner;

pub use closer::{Closer, CloserFn, CloserRef};
pub use runner::{Runner, RunnerFn, RunnerRef};
