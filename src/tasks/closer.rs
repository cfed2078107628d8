//! # Closer abstraction and closure-backed implementation.
//!
//! A [`Closer`] releases one resource during shutdown. Closers run strictly in
//! reverse registration order, one at a time; a failing or panicking closer
//! does not stop the ones after it.

use std::{borrow::Cow, future::Future, sync::Arc, sync::Mutex};

use async_trait::async_trait;

/// # Shared handle to a closer object.
pub type CloserRef = Arc<dyn Closer>;

/// # Asynchronous cleanup action.
#[async_trait]
pub trait Closer: Send + Sync + 'static {
    /// Returns a stable, human-readable closer name used in logs and events.
    fn name(&self) -> &str;

    /// Releases the resource.
    async fn close(&self) -> anyhow::Result<()>;
}

/// # Closure-backed closer.
///
/// Same shape as [`RunnerFn`](crate::RunnerFn): an `FnMut() -> Fut` guarded by
/// a mutex held only while the future is created.
///
/// # Example
/// ```
/// use runvisor::{CloserFn, CloserRef};
///
/// let c: CloserRef = CloserFn::arc("db-pool", || async {
///     // pool.close().await
///     Ok(())
/// });
/// assert_eq!(c.name(), "db-pool");
/// ```
pub struct CloserFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    name: Cow<'static, str>,
    func: Mutex<Fnc>,
}

impl<Fnc, Fut> CloserFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    /// Creates a new closure-backed closer.
    pub fn new(name: impl Into<Cow<'static, str>>, func: Fnc) -> Self {
        Self {
            name: name.into(),
            func: Mutex::new(func),
        }
    }

    /// Creates the closer and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, func: Fnc) -> CloserRef {
        Arc::new(Self::new(name, func))
    }
}

#[async_trait]
impl<Fnc, Fut> Closer for CloserFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn close(&self) -> anyhow::Result<()> {
        let fut = {
            let mut f = self
                .func
                .lock()
                .map_err(|_| anyhow::anyhow!("closer {:?}: closure mutex poisoned", self.name))?;
            (f)()
        };
        fut.await
    }
}

impl<Fnc, Fut> std::fmt::Debug for CloserFn<Fnc, Fut>
where
    Fnc: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloserFn").field("name", &self.name).finish()
    }
}
