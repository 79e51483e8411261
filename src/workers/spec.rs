//! # Worker specification.

use crate::core::Config;
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::workers::ScannerRef;

/// A scanner plus the policies it is supervised with.
///
/// The camera source id is the worker's position in the list passed to
/// [`Supervisor::run`](crate::Supervisor::run).
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use scanvisor::{Config, Outbox, RestartPolicy, ScannerFn, ScannerRef, WorkerError, WorkerSpec};
///
/// let cam: ScannerRef = ScannerFn::arc("camera-left", |_out: Outbox, _ctx: CancellationToken| async {
///     Ok::<(), WorkerError>(())
/// });
///
/// let spec = WorkerSpec::with_defaults(cam, &Config::default())
///     .with_restart(RestartPolicy::Never);
/// assert_eq!(spec.name(), "camera-left");
/// ```
#[derive(Clone)]
pub struct WorkerSpec {
    scanner: ScannerRef,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
}

impl WorkerSpec {
    pub fn new(scanner: ScannerRef, restart: RestartPolicy, backoff: BackoffPolicy) -> Self {
        Self {
            scanner,
            restart,
            backoff,
        }
    }

    /// Takes restart and backoff from `cfg`.
    pub fn with_defaults(scanner: ScannerRef, cfg: &Config) -> Self {
        Self::new(scanner, cfg.restart, cfg.backoff)
    }

    pub fn scanner(&self) -> &ScannerRef {
        &self.scanner
    }

    pub fn name(&self) -> &str {
        self.scanner.name()
    }

    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }
}
