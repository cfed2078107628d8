//! # Runner abstraction and closure-backed implementation.
//!
//! A [`Runner`] is a long-lived unit (server loop, consumer, poller) that the
//! lifecycle launches once and waits for during shutdown. It takes no
//! arguments: if a runner has to stop on shutdown it observes that through its
//! own means, typically a token from
//! [`LifecycleBuilder::shutdown_token`](crate::LifecycleBuilder::shutdown_token)
//! captured by its closure.
//!
//! Returning `Err` or panicking marks the process as failed and triggers
//! shutdown.

use std::{borrow::Cow, future::Future, sync::Arc, sync::Mutex};

use async_trait::async_trait;

/// # Shared handle to a runner object.
pub type RunnerRef = Arc<dyn Runner>;

/// # Long-lived asynchronous worker.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use runvisor::Runner;
///
/// struct Poller;
///
/// #[async_trait]
/// impl Runner for Poller {
///     fn name(&self) -> &str { "poller" }
///
///     async fn run(&self) -> anyhow::Result<()> {
///         // poll until told to stop...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Returns a stable, human-readable runner name used in logs and events.
    fn name(&self) -> &str;

    /// Runs the worker until it finishes or fails.
    async fn run(&self) -> anyhow::Result<()>;
}

/// # Closure-backed runner.
///
/// Wraps `Fnc: FnMut() -> Fut`. The closure sits behind a [`Mutex`] that is
/// held only while the future is created, never while it runs, so the closure
/// may move owned resources (receivers, listeners) into its future.
///
/// # Example
/// ```
/// use runvisor::{RunnerFn, RunnerRef};
///
/// let r: RunnerRef = RunnerFn::arc("worker", || async {
///     // do work...
///     Ok(())
/// });
/// assert_eq!(r.name(), "worker");
/// ```
pub struct RunnerFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    name: Cow<'static, str>,
    func: Mutex<Fnc>,
}

impl<Fnc, Fut> RunnerFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    /// Creates a new closure-backed runner.
    ///
    /// Prefer [`RunnerFn::arc`] when you immediately need a [`RunnerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, func: Fnc) -> Self {
        Self {
            name: name.into(),
            func: Mutex::new(func),
        }
    }

    /// Creates the runner and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, func: Fnc) -> RunnerRef {
        Arc::new(Self::new(name, func))
    }
}

#[async_trait]
impl<Fnc, Fut> Runner for RunnerFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self) -> anyhow::Result<()> {
        let fut = {
            let mut f = self
                .func
                .lock()
                .map_err(|_| anyhow::anyhow!("runner {:?}: closure mutex poisoned", self.name))?;
            (f)()
        };
        fut.await
    }
}

impl<Fnc, Fut> std::fmt::Debug for RunnerFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerFn").field("name", &self.name).finish()
    }
}
