use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{config::Config, lifecycle::Lifecycle, trigger::ShutdownTrigger};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
    tasks::{CloserFn, CloserRef, RunnerFn, RunnerRef},
};

/// Builder that collects runners, closers and subscribers before a
/// [`Lifecycle`] is built.
///
/// Registration only exists here: a built lifecycle is immutable, so adding
/// work after `start` cannot happen.
pub struct LifecycleBuilder {
    cfg: Config,
    runners: Vec<RunnerRef>,
    closers: Vec<CloserRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    shutting_down: CancellationToken,
    trigger: ShutdownTrigger,
}

impl LifecycleBuilder {
    /// Creates a builder with empty registries.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            runners: Vec::new(),
            closers: Vec::new(),
            subscribers: Vec::new(),
            shutting_down: CancellationToken::new(),
            trigger: ShutdownTrigger::new(CancellationToken::new()),
        }
    }

    /// Registers a runner. Runners start concurrently, in no particular order.
    pub fn add_runner(mut self, runner: RunnerRef) -> Self {
        self.runners.push(runner);
        self
    }

    /// Registers a closer. Closers run in reverse registration order.
    pub fn add_closer(mut self, closer: CloserRef) -> Self {
        self.closers.push(closer);
        self
    }

    /// Registers a closure-backed runner.
    pub fn runner<Fnc, Fut>(self, name: impl Into<Cow<'static, str>>, func: Fnc) -> Self
    where
        Fnc: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_runner(RunnerFn::arc(name, func))
    }

    /// Registers a closure-backed closer.
    pub fn closer<Fnc, Fut>(self, name: impl Into<Cow<'static, str>>, func: Fnc) -> Self
    where
        Fnc: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add_closer(CloserFn::arc(name, func))
    }

    /// Sets event subscribers for observability.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Returns a token cancelled the moment shutdown begins.
    ///
    /// Runners capture it to stop cooperatively; the lifecycle itself never
    /// cancels runners any other way.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutting_down.child_token()
    }

    /// Returns a handle that asks the started lifecycle to shut down.
    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }

    /// Builds the lifecycle.
    ///
    /// With subscribers configured this spawns the subscriber workers, so it
    /// must then be called within a tokio runtime.
    pub fn build(self) -> Arc<Lifecycle> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        let listener = if self.subscribers.is_empty() {
            None
        } else {
            let set = SubscriberSet::new(self.subscribers, bus.clone());
            Some(Lifecycle::subscriber_listener(&bus, set))
        };

        Arc::new(Lifecycle::new_internal(
            self.cfg,
            bus,
            self.runners,
            self.closers,
            self.shutting_down,
            self.trigger,
            listener,
        ))
    }
}

impl std::fmt::Debug for LifecycleBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleBuilder")
            .field("cfg", &self.cfg)
            .field("runners", &self.runners.len())
            .field("closers", &self.closers.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
