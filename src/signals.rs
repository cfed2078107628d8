//! # OS signal adapter.
//!
//! Turns process signals into a lifecycle shutdown. The adapter is an
//! ordinary runner named `signals`: it waits for one of the configured
//! signals, fires the lifecycle's [`ShutdownTrigger`] and returns. When
//! shutdown starts for another reason it returns as well, so it never holds
//! up the teardown.
//!
//! ## Unix
//! Listens for the configured subset of:
//! - **SIGINT** (Ctrl-C in terminal)
//! - **SIGTERM** (default kill signal, used by systemd/Kubernetes)
//! - **SIGQUIT**
//! - **SIGHUP**
//!
//! SIGKILL cannot be caught; a killed process gets no teardown.
//!
//! ## Windows
//! On non-Unix platforms only [`tokio::signal::ctrl_c`] is awaited and
//! reported as [`ShutdownSignal::Interrupt`].
//!
//! ## Example
//! ```rust,no_run
//! use runvisor::{Config, Lifecycle, ShutdownSignal};
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let lifecycle = Lifecycle::builder(Config::default())
//!         .shutdown_on_signals(&[ShutdownSignal::Interrupt, ShutdownSignal::Terminate])
//!         .closer("flush", || async { Ok(()) })
//!         .build();
//!
//!     match lifecycle.run().await {
//!         Ok(code) => code.into(),
//!         Err(_) => std::process::ExitCode::FAILURE,
//!     }
//! }
//! ```

use std::{fmt, io};

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    core::{LifecycleBuilder, ShutdownTrigger},
    tasks::Runner,
};

/// Signals [`LifecycleBuilder::shutdown_on_signals`] listens for when given an empty list.
pub const DEFAULT_SIGNALS: &[ShutdownSignal] = &[
    ShutdownSignal::Interrupt,
    ShutdownSignal::Terminate,
    ShutdownSignal::Quit,
];

/// Catchable signals that may request shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    /// SIGINT.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGQUIT.
    Quit,
    /// SIGHUP.
    Hangup,
}

impl ShutdownSignal {
    #[cfg(unix)]
    fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            ShutdownSignal::Interrupt => SignalKind::interrupt(),
            ShutdownSignal::Terminate => SignalKind::terminate(),
            ShutdownSignal::Quit => SignalKind::quit(),
            ShutdownSignal::Hangup => SignalKind::hangup(),
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::Quit => "SIGQUIT",
            ShutdownSignal::Hangup => "SIGHUP",
        })
    }
}

/// Source of delivered signals.
///
/// [`OsSignals`] reads the process signals; a
/// `tokio::sync::mpsc::Receiver<ShutdownSignal>` works as an in-process
/// source, which is how tests drive the adapter.
#[async_trait]
pub trait SignalSource: Send + 'static {
    /// Waits for the next signal. `Ok(None)` means the source is exhausted.
    async fn recv(&mut self) -> io::Result<Option<ShutdownSignal>>;
}

#[async_trait]
impl SignalSource for mpsc::Receiver<ShutdownSignal> {
    async fn recv(&mut self) -> io::Result<Option<ShutdownSignal>> {
        Ok(mpsc::Receiver::recv(self).await)
    }
}

/// Process signal listener.
///
/// Handlers are installed on the first `recv`, inside the runtime, so the
/// value itself can be built anywhere. With no signal it can listen for on
/// this platform, `recv` never completes.
#[derive(Debug)]
pub struct OsSignals {
    signals: Vec<ShutdownSignal>,
    #[cfg(unix)]
    listeners: Option<Vec<(ShutdownSignal, tokio::signal::unix::Signal)>>,
}

impl OsSignals {
    /// Listens for `signals`.
    pub fn new(signals: &[ShutdownSignal]) -> Self {
        Self {
            signals: signals.to_vec(),
            #[cfg(unix)]
            listeners: None,
        }
    }
}

#[cfg(unix)]
#[async_trait]
impl SignalSource for OsSignals {
    async fn recv(&mut self) -> io::Result<Option<ShutdownSignal>> {
        use futures::future::{FutureExt, pending, select_all};
        use tokio::signal::unix::signal;

        if self.listeners.is_none() {
            let mut installed = Vec::with_capacity(self.signals.len());
            for sig in &self.signals {
                installed.push((*sig, signal(sig.kind())?));
            }
            self.listeners = Some(installed);
        }
        let listeners = match self.listeners.as_mut() {
            Some(listeners) if !listeners.is_empty() => listeners,
            // Nothing to listen for is not an exhausted source.
            _ => return pending().await,
        };

        let pending = listeners
            .iter_mut()
            .map(|(sig, l)| {
                let sig = *sig;
                l.recv().map(move |got| got.map(|()| sig)).boxed()
            })
            .collect::<Vec<_>>();
        let (got, _, _) = select_all(pending).await;
        Ok(got)
    }
}

#[cfg(not(unix))]
#[async_trait]
impl SignalSource for OsSignals {
    async fn recv(&mut self) -> io::Result<Option<ShutdownSignal>> {
        if !self.signals.contains(&ShutdownSignal::Interrupt) {
            return futures::future::pending().await;
        }
        tokio::signal::ctrl_c().await?;
        Ok(Some(ShutdownSignal::Interrupt))
    }
}

/// Runner that fires the shutdown trigger on the first configured signal.
struct SignalRunner<S> {
    source: Mutex<S>,
    signals: Vec<ShutdownSignal>,
    trigger: ShutdownTrigger,
    shutdown: CancellationToken,
}

#[async_trait]
impl<S: SignalSource> Runner for SignalRunner<S> {
    fn name(&self) -> &str {
        "signals"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let mut source = self.source.lock().await;
        loop {
            let got = tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                got = source.recv() => got.context("listening for signals")?,
            };

            match got {
                Some(sig) if self.signals.contains(&sig) => {
                    tracing::info!(signal = %sig, "shutdown signal received");
                    break;
                }
                Some(sig) => {
                    tracing::debug!(signal = %sig, "ignoring unconfigured signal");
                }
                None => {
                    tracing::debug!("signal source closed");
                    break;
                }
            }
        }

        self.trigger.fire();
        Ok(())
    }
}

impl LifecycleBuilder {
    /// Registers a runner that shuts the lifecycle down on any of `signals`
    /// delivered to the process. An empty list means [`DEFAULT_SIGNALS`].
    pub fn shutdown_on_signals(self, signals: &[ShutdownSignal]) -> Self {
        let signals = if signals.is_empty() { DEFAULT_SIGNALS } else { signals };
        let source = OsSignals::new(signals);
        self.shutdown_on(source, signals)
    }

    /// Like [`shutdown_on_signals`](Self::shutdown_on_signals) with a custom
    /// [`SignalSource`]. Signals not in `signals` are ignored.
    pub fn shutdown_on<S: SignalSource>(self, source: S, signals: &[ShutdownSignal]) -> Self {
        let signals = if signals.is_empty() { DEFAULT_SIGNALS } else { signals };
        let runner = SignalRunner {
            source: Mutex::new(source),
            signals: signals.to_vec(),
            trigger: self.trigger(),
            shutdown: self.shutdown_token(),
        };
        self.add_runner(std::sync::Arc::new(runner))
    }
}
