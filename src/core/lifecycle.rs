//! # Lifecycle: launches runners, watches for failure, tears down exactly once.
//!
//! ## High-level flow
//! ```text
//! start():
//!   no closers?  ─► warn + NoClosers
//!   errors = mpsc(max(N, 1))
//!   for runner in runners ─► tracker.spawn(unit):
//!        launched.send(())                      (before the body runs)
//!        run_runner(body)  ─ Err/panic ─► errors.try_send(e)
//!        (tracker count drops when the unit exits, whatever the outcome)
//!   join_all(launched) ─► started.cancel() ─► AllStarted
//!   spawn watcher:
//!        shutting_down ─► exit quietly
//!        trigger       ─► begin_teardown("triggered")
//!        errors.recv() ─► exit=Failure, log, begin_teardown("runner_failed")
//!
//! shutdown():
//!   completed? ─► return code (warn if nobody listens)
//!   begin_teardown("requested") ─► wait_completion()
//!
//! teardown (spawned once, guarded by an atomic latch):
//!   a. shutting_down.cancel()
//!   b. close_all(closers.rev())          failures ─► exit=Failure, log
//!   c. wait out a racing start; tracker.close(); tracker.wait()   (straggler reports)
//!   d. errors.close(); drain             each ─► exit=Failure, log
//!   e. exit.set(Success) (no-op after a failure) ─► completion.send(code)
//! ```
//!
//! ## Rules
//! - Teardown body runs at most once; concurrent `shutdown` callers all receive the same code.
//! - The teardown runs in its own task so a caller dropping its `shutdown` future cannot cut it short.
//! - The completion value is published once, after every closer ran and every runner returned.
//! - The error channel holds one slot per runner, so no runner ever waits to report.
//! - `start` spawns runners under the `launching` lock, which teardown takes before draining.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;

use super::{
    alive::AliveSet,
    builder::LifecycleBuilder,
    closer::close_all,
    config::Config,
    exit::{ExitCode, ExitState},
    runner::run_runner,
    trigger::ShutdownTrigger,
};
use crate::{
    error::{LifecycleError, RuntimeError},
    events::{Bus, Event, EventKind},
    subscribers::SubscriberSet,
    tasks::{CloserRef, RunnerRef},
};

/// Coordinates runners, closers, the exit code and its publication.
///
/// Built through [`LifecycleBuilder`]; shared as `Arc<Lifecycle>`. Several
/// lifecycles in one process are fully independent.
///
/// ## Example
/// ```rust
/// use runvisor::{Config, ExitCode, Lifecycle};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let builder = Lifecycle::builder(Config::default());
///     let stop = builder.shutdown_token();
///
///     let lifecycle = builder
///         .runner("ticker", move || {
///             let stop = stop.clone();
///             async move {
///                 stop.cancelled().await;
///                 Ok(())
///             }
///         })
///         .closer("flush", || async { Ok(()) })
///         .build();
///
///     lifecycle.start().await.unwrap();
///     assert_eq!(lifecycle.shutdown().await, ExitCode::Success);
/// }
/// ```
pub struct Lifecycle {
    cfg: Config,
    bus: Bus,
    runners: Vec<RunnerRef>,
    closers: Vec<CloserRef>,

    /// Cancelled once every runner has begun.
    started: CancellationToken,
    /// Cancelled when teardown begins.
    shutting_down: CancellationToken,
    trigger: ShutdownTrigger,

    launch_latch: AtomicBool,
    teardown_latch: AtomicBool,
    /// Held by `start` while it spawns runners; teardown takes it before draining.
    launching: Mutex<()>,

    /// Runner units not yet returned.
    outstanding: TaskTracker,
    alive: AliveSet,
    /// Receiving half of the runner error channel; `None` until `start`.
    errors: Mutex<Option<mpsc::Receiver<LifecycleError>>>,

    exit: ExitState,
    completion: watch::Sender<Option<ExitCode>>,

    /// Stops the subscriber listener when the lifecycle is dropped.
    _listener: Option<DropGuard>,
}

impl Lifecycle {
    /// Returns a builder with empty registries.
    pub fn builder(cfg: Config) -> LifecycleBuilder {
        LifecycleBuilder::new(cfg)
    }

    pub(super) fn new_internal(
        cfg: Config,
        bus: Bus,
        runners: Vec<RunnerRef>,
        closers: Vec<CloserRef>,
        shutting_down: CancellationToken,
        trigger: ShutdownTrigger,
        listener: Option<DropGuard>,
    ) -> Self {
        let (completion, _) = watch::channel(None);
        Self {
            cfg,
            bus,
            runners,
            closers,
            started: CancellationToken::new(),
            shutting_down,
            trigger,
            launch_latch: AtomicBool::new(false),
            teardown_latch: AtomicBool::new(false),
            launching: Mutex::new(()),
            outstanding: TaskTracker::new(),
            alive: AliveSet::new(),
            errors: Mutex::new(None),
            exit: ExitState::new(),
            completion,
            _listener: listener,
        }
    }

    /// Forwards bus events to the subscriber set for as long as the lifecycle lives.
    ///
    /// Advisories published after completion (a late `shutdown`) still reach
    /// subscribers. Dropping the returned guard flushes what is buffered and
    /// stops the workers.
    pub(super) fn subscriber_listener(bus: &Bus, set: SubscriberSet) -> DropGuard {
        let mut rx = bus.subscribe();
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stopped.cancelled() => {
                        while let Ok(ev) = rx.try_recv() {
                            set.emit(ev);
                        }
                        break;
                    }
                }
            }
            set.shutdown().await;
        });

        stop.drop_guard()
    }

    /// Launches every runner and returns once all of them have begun executing.
    ///
    /// Returns [`RuntimeError::AlreadyStarted`] on a second call and
    /// [`RuntimeError::ShuttingDown`] if teardown has already begun.
    pub async fn start(self: &Arc<Self>) -> Result<(), RuntimeError> {
        let gate = self.launching.lock().await;
        if self.shutting_down.is_cancelled() {
            return Err(RuntimeError::ShuttingDown);
        }
        if self.launch_latch.swap(true, Ordering::AcqRel) {
            return Err(RuntimeError::AlreadyStarted);
        }

        let n = self.runners.len();
        if self.closers.is_empty() {
            tracing::warn!("no closers registered; shutdown will not clean anything up");
            self.bus.publish(Event::new(EventKind::NoClosers));
        }

        let (tx, rx) = mpsc::channel(n.max(1));
        *self.errors.lock().await = Some(rx);

        let mut launched = Vec::with_capacity(n);
        for (idx, runner) in self.runners.iter().enumerate() {
            let (up_tx, up_rx) = oneshot::channel();
            launched.push(up_rx);
            self.launch(idx, Arc::clone(runner), tx.clone(), up_tx);
        }
        drop(tx);
        drop(gate);

        join_all(launched).await;
        self.started.cancel();
        tracing::debug!(runners = n, "all runners started");
        self.bus.publish(Event::new(EventKind::AllStarted));

        tokio::spawn(Arc::clone(self).watch_failures());
        Ok(())
    }

    /// Spawns one tracked runner unit.
    fn launch(
        self: &Arc<Self>,
        idx: usize,
        runner: RunnerRef,
        errors: mpsc::Sender<LifecycleError>,
        launched: oneshot::Sender<()>,
    ) {
        let me = Arc::clone(self);
        self.outstanding.spawn(async move {
            me.alive.insert(idx, runner.name().into());
            let _ = launched.send(());

            if let Err(err) = run_runner(runner.as_ref(), &me.bus).await {
                if let Err(rejected) = errors.try_send(err) {
                    // Only reachable if the channel was closed under us.
                    let err = match rejected {
                        mpsc::error::TrySendError::Full(e) | mpsc::error::TrySendError::Closed(e) => e,
                    };
                    me.record_failure(&err);
                }
            }
            me.alive.remove(idx);
        });
    }

    /// Waits for the first runner failure or an external trigger.
    async fn watch_failures(self: Arc<Self>) {
        let first = {
            let mut guard = self.errors.lock().await;
            let Some(rx) = guard.as_mut() else {
                return;
            };
            tokio::select! {
                _ = self.shutting_down.cancelled() => return,
                _ = self.trigger.fired() => None,
                Some(err) = rx.recv() => Some(err),
            }
        };

        match first {
            Some(err) => {
                self.exit.set(ExitCode::Failure);
                self.log_failure(&err);
                if !self.shutting_down.is_cancelled() {
                    self.begin_teardown("runner_failed");
                }
            }
            None => {
                if !self.shutting_down.is_cancelled() {
                    tracing::info!("shutdown triggered");
                    self.begin_teardown("triggered");
                }
            }
        }
    }

    /// Requests shutdown and returns the final exit code.
    ///
    /// Safe to call any number of times, concurrently, before or after
    /// `start`, and after completion. Only the first call runs the teardown;
    /// every call returns the same code.
    pub async fn shutdown(self: &Arc<Self>) -> ExitCode {
        if let Some(code) = self.exit_code() {
            if self.completion.receiver_count() == 0 {
                tracing::warn!(code = code.as_i32(), "lifecycle already closed; completion not observed");
                self.bus
                    .publish(Event::new(EventKind::CompletionUnobserved).with_code(code));
            } else {
                tracing::debug!(code = code.as_i32(), "lifecycle already closed");
            }
            return code;
        }

        self.begin_teardown("requested");
        self.wait_completion().await
    }

    /// Spawns the teardown unless another trigger already did.
    fn begin_teardown(self: &Arc<Self>, reason: &'static str) {
        if self
            .teardown_latch
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        tracing::info!(reason, "shutdown requested");
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));

        let me = Arc::clone(self);
        tokio::spawn(async move { me.teardown().await });
    }

    async fn teardown(&self) {
        self.shutting_down.cancel();

        close_all(&self.closers, &self.bus, |err| self.record_failure(&err)).await;

        // A concurrent `start` has either spawned every runner or will see the cancelled token.
        drop(self.launching.lock().await);
        self.drain_runners().await;
        self.bus.publish(Event::new(EventKind::RunnersDrained));

        self.drain_errors().await;

        self.exit.set(ExitCode::Success);
        let code = self.exit.get().unwrap_or(ExitCode::Failure);
        self.completion.send_replace(Some(code));

        tracing::info!(code = code.as_i32(), "lifecycle completed");
        self.bus.publish(Event::new(EventKind::Completed).with_code(code));
    }

    /// Blocks until every runner unit has returned.
    async fn drain_runners(&self) {
        self.outstanding.close();

        let Some(every) = self.cfg.straggler_report() else {
            self.outstanding.wait().await;
            return;
        };

        let done = self.outstanding.wait();
        tokio::pin!(done);
        let mut report = time::interval_at(Instant::now() + every, every);

        loop {
            tokio::select! {
                _ = &mut done => return,
                _ = report.tick() => {
                    let pending = self.alive.snapshot();
                    tracing::warn!(count = pending.len(), pending = ?pending, "still waiting for runners");
                    self.bus.publish(
                        Event::new(EventKind::StragglersPending).with_reason(pending.join(",")),
                    );
                }
            }
        }
    }

    /// Closes the error channel and logs everything left in it.
    async fn drain_errors(&self) {
        let mut guard = self.errors.lock().await;
        let Some(rx) = guard.as_mut() else {
            return;
        };

        rx.close();
        while let Some(err) = rx.recv().await {
            self.record_failure(&err);
        }
    }

    fn record_failure(&self, err: &LifecycleError) {
        self.exit.set(ExitCode::Failure);
        self.log_failure(err);
    }

    fn log_failure(&self, err: &LifecycleError) {
        tracing::error!(kind = err.as_label(), source = err.source_name(), error = %err, "lifecycle failure");
    }

    /// Completes once every runner has begun executing.
    pub async fn wait_started(&self) {
        self.started.cancelled().await;
    }

    /// Completes with the final exit code once teardown has finished.
    pub async fn wait_completion(&self) -> ExitCode {
        let mut rx = self.completion.subscribe();
        let code = match rx.wait_for(Option::is_some).await {
            Ok(published) => *published,
            Err(_) => None,
        };
        code.unwrap_or(ExitCode::Failure)
    }

    /// Starts the lifecycle and waits for its completion.
    ///
    /// Shutdown then comes from a runner failure or the [`ShutdownTrigger`]
    /// (for example a signal adapter); or another task calls [`Lifecycle::shutdown`].
    pub async fn run(self: &Arc<Self>) -> Result<ExitCode, RuntimeError> {
        self.start().await?;
        Ok(self.wait_completion().await)
    }

    /// Returns the final exit code if completion has been published.
    pub fn exit_code(&self) -> Option<ExitCode> {
        *self.completion.borrow()
    }

    /// Returns `true` once teardown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.is_cancelled()
    }

    /// Returns a token cancelled the moment shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutting_down.child_token()
    }

    /// Returns a handle that asks this lifecycle to shut down.
    pub fn trigger(&self) -> ShutdownTrigger {
        self.trigger.clone()
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("runners", &self.runners.len())
            .field("closers", &self.closers.len())
            .field("started", &self.started.is_cancelled())
            .field("shutting_down", &self.shutting_down.is_cancelled())
            .field("outstanding", &self.outstanding.len())
            .field("exit_code", &self.exit_code())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn lifecycle() -> LifecycleBuilder {
        Lifecycle::builder(Config::default())
    }

    #[tokio::test]
    async fn test_shutdown_before_start_completes_success() {
        let lc = lifecycle().closer("noop", || async { Ok(()) }).build();

        assert_eq!(lc.shutdown().await, ExitCode::Success);
        assert_eq!(lc.exit_code(), Some(ExitCode::Success));
        assert_eq!(lc.start().await, Err(RuntimeError::ShuttingDown));
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let lc = lifecycle().build();

        lc.start().await.unwrap();
        assert_eq!(lc.start().await, Err(RuntimeError::AlreadyStarted));
        assert_eq!(lc.shutdown().await, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_runner_error_shuts_down_by_itself() {
        let lc = lifecycle()
            .runner("bad", || async { anyhow::bail!("nope") })
            .build();

        lc.start().await.unwrap();
        let code = tokio::time::timeout(Duration::from_secs(5), lc.wait_completion())
            .await
            .unwrap();

        assert_eq!(code, ExitCode::Failure);
        assert!(lc.is_shutting_down());
    }

    #[tokio::test]
    async fn test_trigger_before_start_takes_effect_after_start() {
        let builder = lifecycle();
        let trigger = builder.trigger();
        let stop = builder.shutdown_token();
        let lc = builder
            .runner("waiter", move || {
                let stop = stop.clone();
                async move {
                    stop.cancelled().await;
                    Ok(())
                }
            })
            .build();

        trigger.fire();
        let code = tokio::time::timeout(Duration::from_secs(5), lc.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_late_shutdown_returns_recorded_code() {
        let lc = lifecycle()
            .closer("broken", || async { anyhow::bail!("disk full") })
            .build();

        lc.start().await.unwrap();
        assert_eq!(lc.shutdown().await, ExitCode::Failure);
        assert_eq!(lc.shutdown().await, ExitCode::Failure);
    }
}
