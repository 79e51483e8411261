use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::events::Outbox;

/// Future returned by one scanner attempt.
pub type BoxScanFuture = Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send + 'static>>;

/// Shared handle to a scanner.
pub type ScannerRef = Arc<dyn Scanner>;

/// # One camera worker.
///
/// A scanner watches one camera: it detects packs, decodes their codes and reports
/// each pack through its [`Outbox`]. [`scan`](Scanner::scan) is called once per
/// attempt and should run until the stream ends or `ctx` is cancelled.
///
/// Return values drive the restart policy:
/// - `Ok(())` stream ended cleanly;
/// - `Err(WorkerError::Fail)` retry after backoff;
/// - `Err(WorkerError::Fatal)` never retry;
/// - `Err(WorkerError::Canceled)` shutdown observed.
///
/// # Example
/// ```
/// use std::time::SystemTime;
/// use tokio_util::sync::CancellationToken;
/// use scanvisor::{BoxScanFuture, Outbox, Scanner, WorkerError};
///
/// struct OnePack;
///
/// impl Scanner for OnePack {
///     fn name(&self) -> &str { "one-pack" }
///
///     fn scan(&self, outbox: Outbox, ctx: CancellationToken) -> BoxScanFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(WorkerError::Canceled);
///             }
///             let now = SystemTime::now();
///             outbox.observe(now, now, ["QR1"], ["4600000000001"]).await
///         })
///     }
/// }
/// ```
pub trait Scanner: Send + Sync + 'static {
    /// Stable camera name, used in logs.
    fn name(&self) -> &str;

    /// Starts one attempt.
    fn scan(&self, outbox: Outbox, ctx: CancellationToken) -> BoxScanFuture;
}
