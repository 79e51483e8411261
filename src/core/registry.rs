//! # Worker registry: owns the running camera workers.
//!
//! ```text
//! spawn(source, spec)   → WorkerActor on its own task, child token of the runtime token
//! terminate(source)     → cancel → join (bounded) → removed
//! reap()                → drop handles whose task already finished
//! shutdown(grace)       → cancel all → join all within grace → abort the stuck ones
//! ```
//!
//! ## Rules
//! - One handle per source; the registry is owned by the supervisor loop, so no locking.
//! - Joining never blocks longer than the given grace.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::core::actor::WorkerActor;
use crate::error::RuntimeError;
use crate::events::Bus;
use crate::packs::SourceId;
use crate::workers::WorkerSpec;

/// Handle to a running worker.
struct WorkerHandle {
    name: String,
    join: JoinHandle<()>,
    cancel: CancellationToken,
}

impl WorkerHandle {
    fn is_alive(&self) -> bool {
        !self.join.is_finished()
    }
}

/// Running workers keyed by source.
pub(crate) struct Registry {
    workers: BTreeMap<SourceId, WorkerHandle>,
    runtime_token: CancellationToken,
}

impl Registry {
    pub(crate) fn new(runtime_token: CancellationToken) -> Self {
        Self {
            workers: BTreeMap::new(),
            runtime_token,
        }
    }

    /// Starts the worker for `source`. A previous worker for the same source is cancelled.
    pub(crate) fn spawn(&mut self, source: SourceId, spec: WorkerSpec, bus: &Bus) {
        let cancel = self.runtime_token.child_token();
        let name = spec.name().to_string();
        let actor = WorkerActor::new(
            spec.scanner().clone(),
            spec.restart(),
            spec.backoff(),
            bus.outbox(source),
        );
        let join = tokio::spawn(actor.run(cancel.clone()));

        debug!(%source, worker = %name, "worker spawned");
        if let Some(old) = self.workers.insert(source, WorkerHandle { name, join, cancel }) {
            warn!(%source, worker = %old.name, "replacing a running worker");
            old.cancel.cancel();
        }
    }

    /// Cancels and joins the worker for `source`, waiting at most `grace`.
    pub(crate) async fn terminate(&mut self, source: SourceId, grace: Duration) {
        let Some(handle) = self.workers.remove(&source) else {
            return;
        };
        handle.cancel.cancel();
        let WorkerHandle { name, mut join, .. } = handle;
        match tokio::time::timeout(grace, &mut join).await {
            Ok(Ok(())) => debug!(%source, worker = %name, "worker joined"),
            Ok(Err(e)) => error!(%source, worker = %name, error = %e, "worker task died"),
            Err(_) => {
                warn!(%source, worker = %name, "worker did not stop within grace; aborting");
                join.abort();
            }
        }
    }

    /// Removes handles whose task has already finished.
    pub(crate) fn reap(&mut self) {
        self.workers.retain(|source, h| {
            if !h.is_alive() {
                warn!(%source, worker = %h.name, "worker exited without ScanEnded being handled");
            }
            h.is_alive()
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Cancels every worker and waits up to `grace` for all of them.
    ///
    /// Workers still running after `grace` are aborted and reported in
    /// [`RuntimeError::GraceExceeded`].
    pub(crate) async fn shutdown(&mut self, grace: Duration) -> Result<(), RuntimeError> {
        self.runtime_token.cancel();
        let handles: Vec<(SourceId, WorkerHandle)> =
            std::mem::take(&mut self.workers).into_iter().collect();

        let deadline = tokio::time::Instant::now() + grace;
        let mut stuck = Vec::new();
        for (source, mut h) in handles {
            match tokio::time::timeout_at(deadline, &mut h.join).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(%source, worker = %h.name, error = %e, "worker task died"),
                Err(_) => {
                    h.join.abort();
                    stuck.push(h.name);
                }
            }
        }

        if stuck.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::GraceExceeded { grace, stuck })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::WorkerError;
    use crate::events::{Outbox, ScanMessage};
    use crate::policies::RestartPolicy;
    use crate::workers::{ScannerFn, ScannerRef, WorkerSpec};

    fn idle(name: &'static str) -> WorkerSpec {
        let s: ScannerRef = ScannerFn::arc(name, |_o: Outbox, t: CancellationToken| async move {
            t.cancelled().await;
            Err::<(), _>(WorkerError::Canceled)
        });
        WorkerSpec::new(s, RestartPolicy::Never, Default::default())
    }

    fn stubborn(name: &'static str) -> WorkerSpec {
        let s: ScannerRef = ScannerFn::arc(name, |_o: Outbox, _t: CancellationToken| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<(), WorkerError>(())
        });
        WorkerSpec::new(s, RestartPolicy::Never, Default::default())
    }

    #[tokio::test]
    async fn terminate_joins_and_removes() {
        let (bus, mut inbox) = Bus::new(16);
        let mut reg = Registry::new(CancellationToken::new());
        reg.spawn(SourceId(0), idle("left"), &bus);
        reg.spawn(SourceId(1), idle("right"), &bus);
        assert_eq!(reg.len(), 2);

        reg.terminate(SourceId(0), Duration::from_secs(1)).await;
        assert_eq!(reg.len(), 1);

        let ended: Vec<_> = inbox
            .drain()
            .into_iter()
            .filter(|m| matches!(m, ScanMessage::ScanEnded { .. }))
            .collect();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].source(), SourceId(0));
    }

    #[tokio::test]
    async fn shutdown_reports_stuck_workers() {
        let (bus, _inbox) = Bus::new(16);
        let mut reg = Registry::new(CancellationToken::new());
        reg.spawn(SourceId(0), idle("left"), &bus);
        reg.spawn(SourceId(1), stubborn("right"), &bus);
        tokio::task::yield_now().await;

        let err = reg.shutdown(Duration::from_millis(50)).await.unwrap_err();
        match err {
            RuntimeError::GraceExceeded { stuck, .. } => assert_eq!(stuck, vec!["right".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn reap_drops_finished_workers() {
        let (bus, _inbox) = Bus::new(16);
        let mut reg = Registry::new(CancellationToken::new());
        let quick: ScannerRef = ScannerFn::arc("quick", |_o: Outbox, _t: CancellationToken| async {
            Ok::<(), WorkerError>(())
        });
        reg.spawn(
            SourceId(0),
            WorkerSpec::new(quick, RestartPolicy::Never, Default::default()),
            &bus,
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        reg.reap();
        assert!(reg.is_empty());
    }
}
