//! # Signals Example
//!
//! A single runner that works until the process receives SIGINT, SIGTERM or
//! SIGQUIT. Press Ctrl-C (or `kill <pid>`) to trigger a clean shutdown and an
//! exit code of 0.
//!
//! ## Run
//! ```bash
//! cargo run --example signals
//! ```

use std::time::Duration;

use runvisor::{Config, DEFAULT_SIGNALS, Lifecycle};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt().with_target(false).init();

    let builder = Lifecycle::builder(Config::default()).shutdown_on_signals(DEFAULT_SIGNALS);
    let stop = builder.shutdown_token();

    let lifecycle = builder
        .runner("worker", move || {
            let stop = stop.clone();
            async move {
                let mut n = 0u64;
                while !stop.is_cancelled() {
                    n += 1;
                    tracing::info!(n, "working; press Ctrl-C to stop");
                    tokio::select! {
                        _ = stop.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                    }
                }
                Ok(())
            }
        })
        .closer("flush", || async {
            tracing::info!("flushing buffers");
            Ok(())
        })
        .build();

    match lifecycle.run().await {
        Ok(code) => code.into(),
        Err(err) => {
            eprintln!("lifecycle error: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
