//! # WorkerActor: supervises one camera.
//!
//! ## Architecture
//! ```text
//! WorkerSpec ──► Registry::spawn ──► WorkerActor::run()
//!
//! loop {
//!   ├─► publish ScanStarted
//!   ├─► run_once() ─────► scanner.scan(outbox, child token)
//!   │       ├─ Ok         → restart.after_success()? sleep(interval) : exit
//!   │       ├─ Fail       → restart.after_failure()? sleep(backoff.next(failures)) : exit
//!   │       ├─ Fatal      → exit
//!   │       └─ Canceled   → exit
//!   └─► cancellation is honored at every wait
//! }
//! publish ScanEnded (exactly once)
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially**.
//! - The failure counter **resets on success**, so backoff restarts from `first`.

use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::runner::run_once;
use crate::events::Outbox;
use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::workers::ScannerRef;

/// Restart loop around one scanner.
pub(crate) struct WorkerActor {
    scanner: ScannerRef,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    outbox: Outbox,
}

impl WorkerActor {
    pub(crate) fn new(
        scanner: ScannerRef,
        restart: RestartPolicy,
        backoff: BackoffPolicy,
        outbox: Outbox,
    ) -> Self {
        Self {
            scanner,
            restart,
            backoff,
            outbox,
        }
    }

    /// Runs until the restart policy gives up, a fatal error, or cancellation.
    pub(crate) async fn run(self, token: CancellationToken) {
        let mut attempt: u64 = 0;
        let mut failures: u32 = 0;

        loop {
            if token.is_cancelled() {
                break;
            }
            let started = select! {
                res = self.outbox.started() => res.is_ok(),
                _ = token.cancelled() => false,
            };
            if !started {
                break;
            }

            attempt += 1;
            let res = run_once(self.scanner.as_ref(), &self.outbox, &token, attempt).await;

            let delay = match res {
                Ok(()) => {
                    failures = 0;
                    if !self.restart.after_success() {
                        break;
                    }
                    self.restart.success_interval()
                }
                Err(e) if e.is_retryable() && self.restart.after_failure() => {
                    let delay = self.backoff.next(failures);
                    failures = failures.saturating_add(1);
                    delay
                }
                Err(_) => break,
            };

            if !self.pause(delay, &token).await {
                break;
            }
        }

        debug!(worker = self.scanner.name(), attempt, "worker exiting");
        self.outbox.ended();
    }

    /// Sleeps for `delay`; returns `false` if cancelled meanwhile.
    async fn pause(&self, delay: Duration, token: &CancellationToken) -> bool {
        if delay.is_zero() {
            return !token.is_cancelled();
        }
        debug!(
            worker = self.scanner.name(),
            delay_ms = delay.as_millis() as u64,
            "next attempt scheduled"
        );
        select! {
            _ = time::sleep(delay) => true,
            _ = token.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::error::WorkerError;
    use crate::events::{Bus, ScanMessage};
    use crate::packs::SourceId;
    use crate::policies::JitterPolicy;
    use crate::workers::ScannerFn;

    fn quick_backoff() -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_millis(1),
            max: Duration::from_millis(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    fn kinds(msgs: &[ScanMessage]) -> Vec<&'static str> {
        msgs.iter()
            .map(|m| match m {
                ScanMessage::ScanStarted { .. } => "started",
                ScanMessage::ScanEnded { .. } => "ended",
                ScanMessage::ScanError { .. } => "error",
                ScanMessage::PackObserved(_) => "observed",
            })
            .collect()
    }

    #[tokio::test]
    async fn failures_are_retried_then_fatal_ends_once() {
        let (bus, mut inbox) = Bus::new(64);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let scanner: ScannerRef = ScannerFn::arc("cam", move |_o: Outbox, _t: CancellationToken| {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err::<(), _>(WorkerError::Fail {
                        error: "lost stream".into(),
                    })
                } else {
                    Err(WorkerError::Fatal {
                        error: "bad credentials".into(),
                    })
                }
            }
        });

        let actor = WorkerActor::new(
            scanner,
            RestartPolicy::OnFailure,
            quick_backoff(),
            bus.outbox(SourceId(0)),
        );
        actor.run(CancellationToken::new()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            kinds(&inbox.drain()),
            vec!["started", "error", "started", "error", "started", "error", "ended"]
        );
    }

    #[tokio::test]
    async fn never_policy_runs_once() {
        let (bus, mut inbox) = Bus::new(16);
        let scanner: ScannerRef = ScannerFn::arc("cam", |o: Outbox, _t: CancellationToken| async move {
            let now = std::time::SystemTime::now();
            o.observe(now, now, ["A"], ["1"]).await
        });
        WorkerActor::new(scanner, RestartPolicy::Never, quick_backoff(), bus.outbox(SourceId(1)))
            .run(CancellationToken::new())
            .await;

        assert_eq!(kinds(&inbox.drain()), vec!["started", "observed", "ended"]);
    }

    #[tokio::test]
    async fn cancellation_ends_a_long_running_scanner() {
        let (bus, mut inbox) = Bus::new(16);
        let scanner: ScannerRef = ScannerFn::arc("cam", |_o: Outbox, t: CancellationToken| async move {
            t.cancelled().await;
            Err::<(), _>(WorkerError::Canceled)
        });
        let token = CancellationToken::new();
        let actor = WorkerActor::new(
            scanner,
            RestartPolicy::default(),
            quick_backoff(),
            bus.outbox(SourceId(0)),
        );
        let join = tokio::spawn(actor.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        join.await.unwrap();

        assert_eq!(kinds(&inbox.drain()), vec!["started", "ended"]);
    }

    #[tokio::test]
    async fn canceled_attempt_is_not_retried() {
        let (bus, mut inbox) = Bus::new(16);
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let scanner: ScannerRef = ScannerFn::arc("cam", move |_o: Outbox, _t: CancellationToken| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(WorkerError::Canceled) }
        });
        WorkerActor::new(
            scanner,
            RestartPolicy::Always { interval: None },
            quick_backoff(),
            bus.outbox(SourceId(0)),
        )
        .run(CancellationToken::new())
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(kinds(&inbox.drain()), vec!["started", "ended"]);
    }
}
