use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use runvisor::{Config, Event, EventKind, ExitCode, Lifecycle, LifecycleBuilder, RuntimeError, Subscribe};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(5);

/// Records every event it receives.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    fn count(&self, kind: EventKind) -> usize {
        self.events.lock().unwrap().iter().filter(|e| e.kind == kind).count()
    }

    fn find(&self, kind: EventKind) -> Option<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.kind == kind)
            .cloned()
    }

    async fn wait_for(&self, kind: EventKind) -> Event {
        tokio::time::timeout(WAIT, async {
            loop {
                if let Some(ev) = self.find(kind) {
                    return ev;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

fn builder() -> LifecycleBuilder {
    Lifecycle::builder(Config::default())
}

fn recording(builder: LifecycleBuilder) -> (LifecycleBuilder, Arc<Recorder>) {
    let rec = Arc::new(Recorder::default());
    let sub: Arc<dyn Subscribe> = rec.clone();
    (builder.with_subscribers(vec![sub]), rec)
}

/// Adds a runner that returns once shutdown begins.
fn cooperative(builder: LifecycleBuilder, name: &'static str) -> LifecycleBuilder {
    let stop = builder.shutdown_token();
    builder.runner(name, move || {
        let stop = stop.clone();
        async move {
            stop.cancelled().await;
            Ok(())
        }
    })
}

/// Adds a closer that appends its name to `log`.
fn logging_closer(
    builder: LifecycleBuilder,
    name: &'static str,
    log: &Arc<Mutex<Vec<&'static str>>>,
) -> LifecycleBuilder {
    let log = Arc::clone(log);
    builder.closer(name, move || {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(name);
            Ok(())
        }
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_lifecycle_shuts_down_cleanly_every_time() {
    let lc = builder().build();
    lc.start().await.unwrap();

    for _ in 0..4 {
        let code = tokio::time::timeout(WAIT, lc.shutdown()).await.unwrap();
        assert_eq!(code, ExitCode::Success);
        assert_eq!(code.as_i32(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn first_runner_error_shuts_down_without_request() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (fail_tx, fail_rx) = oneshot::channel::<()>();
    let mut fail_rx = Some(fail_rx);

    let b = builder().runner("flaky", move || {
        let rx = fail_rx.take();
        async move {
            if let Some(rx) = rx {
                let _ = rx.await;
            }
            anyhow::bail!("lost connection")
        }
    });
    let b = cooperative(b, "steady");
    let b = logging_closer(b, "db", &log);
    let lc = b.build();

    lc.start().await.unwrap();
    assert!(!lc.is_shutting_down());
    fail_tx.send(()).unwrap();

    let code = tokio::time::timeout(WAIT, lc.wait_completion()).await.unwrap();
    assert_eq!(code, ExitCode::Failure);
    assert_eq!(*log.lock().unwrap(), vec!["db"]);
    assert_eq!(lc.shutdown().await, ExitCode::Failure);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_panic_is_contained_and_reported() {
    let (b, rec) = recording(builder());
    let lc = b
        .runner("exploder", || async {
            if true {
                panic!("runner exploded");
            }
            Ok(())
        })
        .closer("noop", || async { Ok(()) })
        .build();

    lc.start().await.unwrap();
    let code = tokio::time::timeout(WAIT, lc.wait_completion()).await.unwrap();
    assert_eq!(code, ExitCode::Failure);

    let failed = rec.wait_for(EventKind::RunnerFailed).await;
    assert_eq!(failed.subject.as_deref(), Some("exploder"));
    assert!(failed.error.as_deref().unwrap_or_default().contains("runner exploded"));

    let done = rec.wait_for(EventKind::Completed).await;
    assert_eq!(done.code, Some(ExitCode::Failure));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closer_panic_does_not_skip_remaining_closers() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let b = logging_closer(builder(), "first", &log);
    let b = b.closer("panicky", || async {
        if true {
            panic!("closer exploded");
        }
        Ok(())
    });
    let lc = b.build();

    lc.start().await.unwrap();
    let code = tokio::time::timeout(WAIT, lc.shutdown()).await.unwrap();

    assert_eq!(code, ExitCode::Failure);
    assert_eq!(*log.lock().unwrap(), vec!["first"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closers_run_in_reverse_registration_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut b = builder();
    for name in ["A", "B", "C"] {
        b = logging_closer(b, name, &log);
    }
    let lc = b.build();

    lc.start().await.unwrap();
    assert_eq!(lc.shutdown().await, ExitCode::Success);
    assert_eq!(*log.lock().unwrap(), vec!["C", "B", "A"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closers_run_before_runners_are_awaited() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (release_tx, release_rx) = oneshot::channel::<()>();
    let mut release_rx = Some(release_rx);

    let runner_log = Arc::clone(&log);
    let b = builder().runner("server", move || {
        let rx = release_rx.take();
        let log = Arc::clone(&runner_log);
        async move {
            if let Some(rx) = rx {
                let _ = rx.await;
            }
            log.lock().unwrap().push("server");
            Ok(())
        }
    });

    let release = Arc::new(Mutex::new(Some(release_tx)));
    let closer_log = Arc::clone(&log);
    let lc = b
        .closer("listener", move || {
            let release = Arc::clone(&release);
            let log = Arc::clone(&closer_log);
            async move {
                log.lock().unwrap().push("listener");
                if let Some(tx) = release.lock().unwrap().take() {
                    let _ = tx.send(());
                }
                Ok(())
            }
        })
        .build();

    lc.start().await.unwrap();
    assert_eq!(tokio::time::timeout(WAIT, lc.shutdown()).await.unwrap(), ExitCode::Success);
    assert_eq!(*log.lock().unwrap(), vec!["listener", "server"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn clean_runners_and_closers_exit_zero() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let b = cooperative(builder(), "http");
    let b = cooperative(b, "consumer");
    let b = logging_closer(b, "cache", &log);
    let b = logging_closer(b, "queue", &log);
    let lc = b.build();

    lc.start().await.unwrap();
    lc.wait_started().await;
    let code = tokio::time::timeout(WAIT, lc.shutdown()).await.unwrap();
    assert_eq!(code, ExitCode::Success);
    assert_eq!(lc.exit_code(), Some(ExitCode::Success));
    assert_eq!(*log.lock().unwrap(), vec!["queue", "cache"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn runner_returning_early_does_not_shut_down() {
    let b = builder().runner("oneshot", || async { Ok(()) });
    let lc = cooperative(b, "steady").build();

    lc.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!lc.is_shutting_down());
    assert_eq!(lc.exit_code(), None);

    assert_eq!(lc.shutdown().await, ExitCode::Success);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zero_runners_complete_with_success() {
    let (b, rec) = recording(builder());
    let lc = b.build();

    lc.start().await.unwrap();
    lc.wait_started().await;
    assert_eq!(lc.shutdown().await, ExitCode::Success);

    rec.wait_for(EventKind::Completed).await;
    assert!(rec.kinds().contains(&EventKind::NoClosers));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_shutdowns_share_one_teardown() {
    let calls = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&calls);
    let b = builder().closer("counted", move || {
        let counter = Arc::clone(&counter);
        async move {
            *counter.lock().unwrap() += 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        }
    });
    let lc = cooperative(b, "steady").build();
    lc.start().await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let lc = Arc::clone(&lc);
        handles.push(tokio::spawn(async move { lc.shutdown().await }));
    }

    let mut codes = Vec::new();
    for handle in handles {
        codes.push(tokio::time::timeout(WAIT, handle).await.unwrap().unwrap());
    }

    assert!(codes.iter().all(|c| *c == ExitCode::Success));
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn api_misuse_is_rejected() {
    let lc = builder().build();
    lc.start().await.unwrap();
    assert_eq!(lc.start().await, Err(RuntimeError::AlreadyStarted));
    assert_eq!(lc.shutdown().await, ExitCode::Success);

    let late = builder().build();
    assert_eq!(late.shutdown().await, ExitCode::Success);
    assert_eq!(late.start().await, Err(RuntimeError::ShuttingDown));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn trigger_shuts_down_and_cancels_token() {
    let b = builder();
    let trigger = b.trigger();
    let token = b.shutdown_token();
    let lc = cooperative(b, "steady").build();

    lc.start().await.unwrap();
    assert!(!token.is_cancelled());

    trigger.fire();
    let code = tokio::time::timeout(WAIT, lc.wait_completion()).await.unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(token.is_cancelled());
    assert!(lc.trigger().is_fired());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_runner_is_reported_while_pending() {
    let cfg = Config {
        straggler_interval: Duration::from_millis(20),
        ..Config::default()
    };
    let (b, rec) = recording(Lifecycle::builder(cfg));
    let stop = b.shutdown_token();
    let lc = b
        .runner("sluggish", move || {
            let stop = stop.clone();
            async move {
                stop.cancelled().await;
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok(())
            }
        })
        .build();

    lc.start().await.unwrap();
    assert_eq!(tokio::time::timeout(WAIT, lc.shutdown()).await.unwrap(), ExitCode::Success);

    let report = rec.wait_for(EventKind::StragglersPending).await;
    assert_eq!(report.reason.as_deref(), Some("sluggish"));
    rec.wait_for(EventKind::RunnersDrained).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unstarted_lifecycle_shuts_down_cleanly_every_time() {
    let lc = builder().build();

    for _ in 0..4 {
        let code = tokio::time::timeout(WAIT, lc.shutdown()).await.unwrap();
        assert_eq!(code, ExitCode::Success);
    }
    assert_eq!(lc.exit_code(), Some(ExitCode::Success));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn simultaneous_failures_are_all_collected() {
    let gate = CancellationToken::new();
    let (mut b, rec) = recording(builder());
    for name in ["left", "right"] {
        let gate = gate.clone();
        b = b.runner(name, move || {
            let gate = gate.clone();
            async move {
                gate.cancelled().await;
                anyhow::bail!("{name} lost its peer")
            }
        });
    }
    let lc = b.closer("noop", || async { Ok(()) }).build();

    lc.start().await.unwrap();
    gate.cancel();

    let code = tokio::time::timeout(WAIT, lc.wait_completion()).await.unwrap();
    assert_eq!(code, ExitCode::Failure);

    rec.wait_for(EventKind::Completed).await;
    assert_eq!(rec.count(EventKind::RunnerFailed), 2);
    assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    assert_eq!(rec.count(EventKind::CloserDone), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn late_shutdown_advisory_reaches_subscribers() {
    let (b, rec) = recording(builder());
    let lc = b.closer("noop", || async { Ok(()) }).build();

    lc.start().await.unwrap();
    assert_eq!(lc.shutdown().await, ExitCode::Success);
    assert_eq!(lc.shutdown().await, ExitCode::Success);

    let advisory = rec.wait_for(EventKind::CompletionUnobserved).await;
    assert_eq!(advisory.code, Some(ExitCode::Success));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_start_and_shutdown_never_skip_a_runner() {
    for _ in 0..200 {
        let finished = Arc::new(AtomicBool::new(false));
        let b = builder();
        let stop = b.shutdown_token();
        let flag = Arc::clone(&finished);
        let lc = b
            .runner("late", move || {
                let stop = stop.clone();
                let flag = Arc::clone(&flag);
                async move {
                    stop.cancelled().await;
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    flag.store(true, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build();

        let starter = {
            let lc = Arc::clone(&lc);
            tokio::spawn(async move { lc.start().await })
        };
        let code = tokio::time::timeout(WAIT, lc.shutdown()).await.unwrap();
        let started = starter.await.unwrap();

        assert_eq!(code, ExitCode::Success);
        match started {
            Ok(()) => assert!(finished.load(Ordering::SeqCst)),
            Err(err) => assert_eq!(err, RuntimeError::ShuttingDown),
        }
    }
}
