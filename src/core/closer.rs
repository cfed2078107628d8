//! # Run closers during teardown.
//!
//! Closers run strictly in reverse registration order, one at a time, each
//! inside the panic boundary. A failing closer is reported through
//! `on_failure` and the remaining closers still run.

use crate::{
    core::boundary::{Fault, contain},
    error::LifecycleError,
    events::{Bus, Event, EventKind},
    tasks::CloserRef,
};

/// Invokes every closer, last registered first.
pub(crate) async fn close_all<F>(closers: &[CloserRef], bus: &Bus, mut on_failure: F)
where
    F: FnMut(LifecycleError),
{
    for closer in closers.iter().rev() {
        let name = closer.name();
        bus.publish(Event::new(EventKind::CloserStarting).with_subject(name));

        let err = match contain(async { closer.close().await }).await {
            Ok(()) => {
                bus.publish(Event::new(EventKind::CloserDone).with_subject(name));
                continue;
            }
            Err(Fault::Error(error)) => LifecycleError::CloserFailed {
                closer: name.to_string(),
                error,
            },
            Err(Fault::Panic(info)) => LifecycleError::CloserPanicked {
                closer: name.to_string(),
                info,
            },
        };

        bus.publish(
            Event::new(EventKind::CloserFailed)
                .with_subject(name)
                .with_error(err.to_string()),
        );
        on_failure(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use crate::tasks::CloserFn;

    fn recording(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> CloserRef {
        let log = Arc::clone(log);
        CloserFn::arc(name, move || {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_earlier_closers() {
        let bus = Bus::new(8);
        let log = Arc::new(Mutex::new(Vec::new()));
        let closers = vec![
            recording("a", &log),
            CloserFn::arc("broken", || async { Err(anyhow::anyhow!("flush failed")) }),
            recording("c", &log),
            CloserFn::arc("exploding", || async {
                if true {
                    panic!("BOOM");
                }
                Ok(())
            }),
        ];

        let mut failures = Vec::new();
        close_all(&closers, &bus, |e| failures.push(e.to_string())).await;

        assert_eq!(*log.lock().unwrap(), vec!["c", "a"]);
        assert_eq!(
            failures,
            vec![
                "closer \"exploding\" panicked: BOOM".to_string(),
                "closer \"broken\" failed: flush failed".to_string(),
            ]
        );
    }
}
