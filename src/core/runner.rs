//! # Run a single scanner attempt.
//!
//! ```text
//! Success:      scanner.scan() → Ok(())            → (nothing published)
//! Cancellation: scanner.scan() → Err(Canceled)     → (nothing published)
//! Failure:      scanner.scan() → Err(Fail/Fatal)   → ScanError
//! Panic:        scanner.scan() panics              → ScanError, treated as Fail
//! ```
//!
//! ## Rules
//! - Derives a **child token** per attempt; child cancellation never affects the parent.
//! - Publishing `ScanError` is itself cancellable so shutdown never waits on a full bus.

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{WorkerError, panic_message};
use crate::events::Outbox;
use crate::workers::Scanner;

/// Executes one attempt of `scanner`, reporting failures through `outbox`.
pub(crate) async fn run_once<S: Scanner + ?Sized>(
    scanner: &S,
    outbox: &Outbox,
    parent: &CancellationToken,
    attempt: u64,
) -> Result<(), WorkerError> {
    let child = parent.child_token();
    let fut = scanner.scan(outbox.clone(), child);

    let res = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(WorkerError::Fail {
            error: format!("scanner panicked: {}", panic_message(&*payload)),
        }),
    };

    if let Err(e @ (WorkerError::Fail { .. } | WorkerError::Fatal { .. })) = &res {
        warn!(
            worker = scanner.name(),
            source = %outbox.source(),
            attempt,
            label = e.as_label(),
            error = %e,
            "scan attempt failed"
        );
        tokio::select! {
            _ = outbox.error(e.to_string()) => {}
            _ = parent.cancelled() => {}
        }
    }
    res
}
