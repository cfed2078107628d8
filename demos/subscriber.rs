//! # Custom Subscriber Example
//!
//! Shows how to implement a custom event subscriber that tracks lifecycle
//! metrics.
//!
//! The example counts:
//! - Runner starts
//! - Failures (runners, closers, subscribers)
//! - Closers completed
//!
//! ## Run
//! ```bash
//! cargo run --example subscriber
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use runvisor::{Config, Event, EventKind, Lifecycle, Subscribe};

#[derive(Default)]
struct MetricsSubscriber {
    starts: AtomicU64,
    failures: AtomicU64,
    closed: AtomicU64,
}

impl MetricsSubscriber {
    fn print_stats(&self) {
        println!();
        println!("Metrics:");
        println!(" ├─► Runner starts:   {}", self.starts.load(Ordering::Relaxed));
        println!(" ├─► Failures:        {}", self.failures.load(Ordering::Relaxed));
        println!(" └─► Closers done:    {}", self.closed.load(Ordering::Relaxed));
    }
}

#[async_trait::async_trait]
impl Subscribe for MetricsSubscriber {
    async fn on_event(&self, ev: &Event) {
        if ev.is_failure() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        match ev.kind {
            EventKind::RunnerStarting => {
                self.starts.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::CloserDone => {
                self.closed.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::Completed => {
                println!("completed with {:?}", ev.code);
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let metrics = Arc::new(MetricsSubscriber::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![metrics.clone()];

    let mut builder = Lifecycle::builder(Config::default()).with_subscribers(subs);
    let stop = builder.shutdown_token();

    for name in ["alpha", "beta", "gamma"] {
        let stop = stop.clone();
        builder = builder.runner(name, move || {
            let stop = stop.clone();
            async move {
                stop.cancelled().await;
                Ok(())
            }
        });
    }
    let lifecycle = builder
        .closer("cache", || async { Ok(()) })
        .closer("queue", || async { Ok(()) })
        .build();

    if let Err(err) = lifecycle.start().await {
        eprintln!("lifecycle error: {err}");
        return std::process::ExitCode::FAILURE;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    let code = lifecycle.shutdown().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    metrics.print_stats();
    code.into()
}
