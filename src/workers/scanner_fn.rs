use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::events::Outbox;
use crate::workers::scanner::{BoxScanFuture, Scanner};

/// Closure-backed [`Scanner`].
///
/// The closure *creates* a new future per attempt.
#[derive(Debug)]
pub struct ScannerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ScannerFn<F> {
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the scanner as a shared handle.
    ///
    /// ## Example
    /// ```rust
    /// use tokio_util::sync::CancellationToken;
    /// use scanvisor::{Outbox, ScannerFn, ScannerRef, WorkerError};
    ///
    /// let cam: ScannerRef = ScannerFn::arc("camera-left", |_out: Outbox, _ctx: CancellationToken| async {
    ///     Ok::<_, WorkerError>(())
    /// });
    /// assert_eq!(cam.name(), "camera-left");
    /// ```
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Scanner for ScannerFn<F>
where
    F: Fn(Outbox, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self, outbox: Outbox, ctx: CancellationToken) -> BoxScanFuture {
        Box::pin((self.f)(outbox, ctx))
    }
}
