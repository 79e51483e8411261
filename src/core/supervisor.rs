//! # Supervisor: runs the camera workers and the event kernel.
//!
//! The [`Supervisor`] owns the worker registry, the message bus, the line
//! settings channel and the gate driver. It wires the kernel handlers, then
//! loops until every worker has ended or a termination signal arrives.
//!
//! ## Architecture
//! ```text
//! WorkerSpec[0]   WorkerSpec[1]
//!       │               │
//!       └─► Registry::spawn(SourceId, spec) ─► WorkerActor ─► Outbox ─┐
//!                                                                     ▼
//!                                                           Bus (bounded mpsc)
//!                                                                     │
//! loop {                                                              │
//!   every `refresh_every` passes → push RefreshExpectedCount, RefreshWorkMode
//!   recv_batch(poll_interval) ◄───────────────────────────────────────┘
//!     └─ push each message; ScanEnded → Registry::terminate(source)
//!   push Tick; kernel.run(now)
//!     ├─ Correlation ───► OutcomeGood / OutcomeBad
//!     ├─ OutcomeFanout ─► SubscriberSet ─► BackendNotifier, LogWriter, ...
//!     ├─ ActuatorController ─► GateCommands ─► gate driver ─► Actuator
//!     └─ SettingsRefresh ─► Backend (spawned) ─► watch<LineSettings>
//!   registry empty → break
//! }
//! shutdown: Registry::shutdown(grace) → final kernel pass → stop → drain subscribers
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use scanvisor::{Config, Outbox, RestartPolicy, ScannerFn, ScannerRef, Supervisor, WorkerError, WorkerSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.poll_interval = Duration::from_millis(20);
//!
//!     let cam: ScannerRef = ScannerFn::arc("camera-left", |out: Outbox, _ctx: CancellationToken| async move {
//!         let now = std::time::SystemTime::now();
//!         out.observe(now, now, ["QR-1", "QR-2"], ["4600000000011", "4600000000028"]).await
//!     });
//!     let spec = WorkerSpec::with_defaults(cam, &cfg).with_restart(RestartPolicy::Never);
//!
//!     Supervisor::builder(cfg).build().run(vec![spec]).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::collaborators::{Actuator, Backend};
use crate::core::builder::SupervisorBuilder;
use crate::core::handlers::{Correlation, LifecycleLog, OutcomeFanout, SettingsRefresh};
use crate::core::registry::Registry;
use crate::core::{Config, EventKernel, shutdown};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventClass, EventKind, ScanMessage};
use crate::gate::{ActuatorController, GateCommands, spawn_driver};
use crate::packs::{CorrelationMode, LineSettings, PackResultCorrelator, PackValidator, SourceId};
use crate::subscribers::{BackendNotifier, Subscribe, SubscriberSet};
use crate::workers::WorkerSpec;

/// Supervises up to two camera workers and decides every pack they observe.
pub struct Supervisor {
    pub(crate) cfg: Config,
    pub(crate) backend: Option<Arc<dyn Backend>>,
    pub(crate) actuator: Arc<dyn Actuator>,
    pub(crate) subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Supervisor {
    /// Starts a [`SupervisorBuilder`] for `cfg`.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs `workers` until they have all ended or a termination signal arrives.
    ///
    /// Worker `i` reports as `SourceId(i)`. One worker runs the correlator in
    /// single mode, two in dual mode.
    pub async fn run(&self, workers: Vec<WorkerSpec>) -> Result<(), RuntimeError> {
        self.run_until(workers, shutdown::shutdown_signal()).await
    }

    /// Like [`run`](Self::run), but stops when `stop` resolves instead of on OS signals.
    pub async fn run_until<F>(&self, workers: Vec<WorkerSpec>, stop: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()>,
    {
        let mode = match CorrelationMode::for_sources(workers.len()) {
            Some(mode) => mode,
            None if workers.is_empty() => return Err(RuntimeError::NoWorkers),
            None => {
                return Err(RuntimeError::TooManyWorkers {
                    count: workers.len(),
                });
            }
        };
        let cfg = &self.cfg;

        let (bus, mut inbox) = Bus::new(cfg.bus_capacity_clamped());
        let (settings_tx, settings_rx) = watch::channel(cfg.initial_settings());
        let (gate_tx, gate_rx) = mpsc::unbounded_channel();
        let driver = spawn_driver(Arc::clone(&self.actuator), gate_rx);
        let subs = Arc::new(SubscriberSet::new(self.outcome_subscribers()));
        let mut kernel = self.wire_kernel(mode, settings_tx, settings_rx, gate_tx, Arc::clone(&subs));

        let mut registry = Registry::new(CancellationToken::new());
        for (i, spec) in workers.into_iter().enumerate() {
            registry.spawn(SourceId(i), spec, &bus);
        }
        info!(workers = registry.len(), ?mode, "line supervisor started");

        let refresh_period = self.backend.as_ref().and(cfg.refresh_period());
        let max_batch = cfg.bus_capacity_clamped();
        let mut pass: u64 = 0;
        tokio::pin!(stop);

        loop {
            if let Some(period) = refresh_period {
                if pass % u64::from(period) == 0 {
                    let now = SystemTime::now();
                    kernel.push(Event::RefreshExpectedCount { due_at: now });
                    kernel.push(Event::RefreshWorkMode { due_at: now });
                }
            }
            pass = pass.wrapping_add(1);

            let messages = tokio::select! {
                _ = &mut stop => {
                    info!("shutdown requested");
                    break;
                }
                received = inbox.recv_batch(cfg.poll_interval, max_batch) => received,
            };

            for msg in messages {
                if let ScanMessage::ScanEnded { source } = &msg {
                    registry.terminate(*source, cfg.grace).await;
                }
                kernel.push(msg.into());
            }

            let now = SystemTime::now();
            kernel.push(Event::Tick { now });
            let passes = kernel.run(now);
            debug!(passes, pending = kernel.pending(), "kernel run");

            registry.reap();
            if registry.is_empty() {
                info!("all workers ended");
                break;
            }
        }

        let res = registry.shutdown(cfg.grace).await;
        if let Err(e) = &res {
            warn!(label = e.as_label(), error = %e, "workers did not stop in time");
        }

        kernel.extend(inbox.drain().into_iter().map(Event::from));
        let now = SystemTime::now();
        kernel.push(Event::Tick { now });
        kernel.run(now);
        // Handlers get their stop hook here, while the gate driver still listens.
        kernel.stop();
        if kernel.pending() > 0 {
            debug!(pending = kernel.pending(), "scheduled events dropped on shutdown");
        }

        // Dropping the kernel closes the gate command channel and releases the subscribers.
        drop(kernel);
        if tokio::time::timeout(cfg.grace, driver).await.is_err() {
            warn!("gate driver did not finish within grace");
        }
        match Arc::try_unwrap(subs) {
            Ok(set) => {
                if tokio::time::timeout(cfg.grace, set.shutdown()).await.is_err() {
                    warn!("subscribers did not drain within grace");
                }
            }
            Err(_) => warn!("subscriber set still shared; skipping drain"),
        }

        info!("line supervisor stopped");
        res
    }

    fn outcome_subscribers(&self) -> Vec<Arc<dyn Subscribe>> {
        let mut subs = self.subscribers.clone();
        if let Some(backend) = &self.backend {
            subs.push(Arc::new(BackendNotifier::new(
                Arc::clone(backend),
                self.cfg.bad_pack_routing,
            )));
        }
        subs
    }

    fn wire_kernel(
        &self,
        mode: CorrelationMode,
        settings_tx: watch::Sender<LineSettings>,
        settings_rx: watch::Receiver<LineSettings>,
        gate: GateCommands,
        subs: Arc<SubscriberSet>,
    ) -> EventKernel {
        let cfg = &self.cfg;
        let mut kernel = EventKernel::new();

        let correlator = PackResultCorrelator::new(
            mode,
            PackValidator::new(cfg.validation.clone()),
            cfg.result_timeout,
            cfg.max_camera_skew,
        );
        kernel.register_for(
            &[
                EventClass::Exact(EventKind::PackObserved),
                EventClass::Exact(EventKind::Tick),
            ],
            Correlation::new(correlator, settings_rx),
        );

        if let Some(backend) = &self.backend {
            kernel.register(
                EventClass::Refresh,
                SettingsRefresh::new(Arc::clone(backend), settings_tx),
            );
        }
        kernel.register(EventClass::Lifecycle, LifecycleLog);
        kernel.register(EventClass::Outcome, OutcomeFanout::new(subs));

        let mut gate_classes = vec![EventClass::Gate];
        if cfg.bad_pack_routing.drops() {
            gate_classes.push(EventClass::Exact(EventKind::OutcomeBad));
        }
        kernel.register_for(
            &gate_classes,
            ActuatorController::new(cfg.gate_timing(), gate),
        );
        kernel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{CollaboratorError, WorkerError};
    use crate::events::Outbox;
    use crate::packs::{CodePair, WorkMode};
    use crate::policies::RestartPolicy;
    use crate::workers::{ScannerFn, ScannerRef};

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<CodePair>>,
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl Backend for Recording {
        async fn work_mode(&self) -> Result<WorkMode, CollaboratorError> {
            Ok(WorkMode::Auto)
        }

        async fn expected_codes_count(&self) -> Result<usize, CollaboratorError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            Ok(2)
        }

        async fn send_codepair(&self, pair: &CodePair) -> Result<(), CollaboratorError> {
            self.sent.lock().unwrap().push(pair.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Gate {
        log: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl Actuator for Gate {
        async fn open(&self) -> Result<(), CollaboratorError> {
            self.log.lock().unwrap().push("open");
            Ok(())
        }

        async fn close(&self) -> Result<(), CollaboratorError> {
            self.log.lock().unwrap().push("close");
            Ok(())
        }
    }

    fn fast_config() -> Config {
        Config {
            poll_interval: Duration::from_millis(10),
            grace: Duration::from_secs(1),
            restart: RestartPolicy::Never,
            ..Config::default()
        }
    }

    fn one_pack(qr: &'static [&'static str], bar: &'static [&'static str]) -> WorkerSpec {
        let s: ScannerRef = ScannerFn::arc("camera", move |out: Outbox, _t: CancellationToken| async move {
            let now = SystemTime::now();
            out.observe(now, now, qr.iter().copied(), bar.iter().copied())
                .await
        });
        WorkerSpec::with_defaults(s, &fast_config())
    }

    #[tokio::test]
    async fn good_pack_reaches_the_backend_and_the_loop_ends() {
        let backend = Arc::new(Recording::default());
        let gate = Arc::new(Gate::default());
        let sup = Supervisor::builder(fast_config())
            .with_backend(backend.clone())
            .with_actuator(gate.clone())
            .build();

        sup.run_until(
            vec![one_pack(&["A", "B"], &["1", "2"])],
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(
            *backend.sent.lock().unwrap(),
            vec![CodePair::new("A", "1"), CodePair::new("B", "2")]
        );
        assert!(gate.log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_pack_is_not_reported_by_default() {
        let backend = Arc::new(Recording::default());
        let sup = Supervisor::builder(fast_config())
            .with_backend(backend.clone())
            .build();

        sup.run_until(vec![one_pack(&["A"], &[])], std::future::pending())
            .await
            .unwrap();

        assert!(backend.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn worker_count_is_checked() {
        let sup = Supervisor::builder(fast_config()).build();
        let err = sup.run_until(Vec::new(), std::future::pending()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NoWorkers));

        let three = vec![one_pack(&["A"], &["1"]); 3];
        let err = sup.run_until(three, std::future::pending()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::TooManyWorkers { count: 3 }));
    }

    #[tokio::test]
    async fn stop_future_ends_a_running_line() {
        let idle: ScannerRef = ScannerFn::arc("idle", |_o: Outbox, t: CancellationToken| async move {
            t.cancelled().await;
            Err::<(), _>(WorkerError::Canceled)
        });
        let sup = Supervisor::builder(fast_config()).build();

        let res = sup
            .run_until(
                vec![WorkerSpec::with_defaults(idle, &fast_config())],
                tokio::time::sleep(Duration::from_millis(50)),
            )
            .await;
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn two_cameras_pair_into_one_pack_while_settings_refresh() {
        let cfg = Config {
            result_timeout: Duration::from_millis(50),
            max_camera_skew: Duration::from_secs(1),
            refresh_every: 2,
            ..fast_config()
        };
        let reads: ScannerRef = ScannerFn::arc("camera-top", |out: Outbox, t: CancellationToken| async move {
            let now = SystemTime::now();
            out.observe(now, now, ["A", "B"], ["1", "2"]).await?;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(300)) => Ok::<(), WorkerError>(()),
                _ = t.cancelled() => Err(WorkerError::Canceled),
            }
        });
        let misses: ScannerRef = ScannerFn::arc("camera-bottom", |out: Outbox, _t: CancellationToken| async move {
            let now = SystemTime::now();
            out.observe(now, now, Vec::<String>::new(), Vec::<String>::new())
                .await
        });

        let backend = Arc::new(Recording::default());
        let gate = Arc::new(Gate::default());
        let sup = Supervisor::builder(cfg.clone())
            .with_backend(backend.clone())
            .with_actuator(gate.clone())
            .build();

        sup.run_until(
            vec![
                WorkerSpec::with_defaults(reads, &cfg),
                WorkerSpec::with_defaults(misses, &cfg),
            ],
            std::future::pending(),
        )
        .await
        .unwrap();

        assert_eq!(
            *backend.sent.lock().unwrap(),
            vec![CodePair::new("A", "1"), CodePair::new("B", "2")],
            "one pack, reported once"
        );
        assert!(gate.log.lock().unwrap().is_empty());
        assert!(
            backend.refreshes.load(Ordering::SeqCst) > 1,
            "settings refreshed more than once while the line ran"
        );
    }
}
