//! Panic boundary for runner and closer bodies.
//!
//! A panic inside a body is caught where the body is polled and turned into a
//! [`Fault::Panic`] carrying the payload text, so it travels the same path as
//! a returned error.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

/// How a body failed.
#[derive(Debug)]
pub(crate) enum Fault {
    Error(anyhow::Error),
    Panic(String),
}

/// Polls `fut` to completion, containing any panic.
pub(crate) async fn contain<F>(fut: F) -> Result<(), Fault>
where
    F: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Fault::Error(e)),
        Err(payload) => Err(Fault::Panic(panic_message(&*payload))),
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
