//! # Basic Example
//!
//! Two runners and two closers. The `ingest` runner fails after a moment,
//! which shuts the whole process down on its own: closers run in reverse
//! order, the `http` runner sees the shutdown token and returns, and the
//! process exits with code 1.
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example basic
//! ```

use std::sync::Arc;
use std::time::Duration;

use runvisor::{Config, Lifecycle, LogWriter, Subscribe};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let builder = Lifecycle::builder(Config::default()).with_subscribers(subs);
    let stop = builder.shutdown_token();

    let lifecycle = builder
        .runner("http", move || {
            let stop = stop.clone();
            async move {
                let mut tick = tokio::time::interval(Duration::from_millis(200));
                loop {
                    tokio::select! {
                        _ = stop.cancelled() => return Ok(()),
                        _ = tick.tick() => tracing::info!("serving"),
                    }
                }
            }
        })
        .runner("ingest", || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            anyhow::bail!("upstream closed the stream")
        })
        .closer("database", || async {
            println!("closing database pool");
            Ok(())
        })
        .closer("listener", || async {
            println!("closing http listener");
            Ok(())
        })
        .build();

    match lifecycle.run().await {
        Ok(code) => {
            println!("exit code: {code}");
            code.into()
        }
        Err(err) => {
            eprintln!("lifecycle error: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
