//! # scanvisor
//!
//! **Scanvisor** supervises a pack-scanning line: one or two cameras read QR
//! codes and barcodes from packs on a conveyor, and the supervisor decides
//! for every pack whether it is good (report its codes to the backend) or bad
//! (push it off the line with a timed reject gate).
//!
//! The decision logic runs in a single-threaded event kernel, so it is
//! deterministic and testable even though the camera inputs are racy and the
//! collaborators fail now and then.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐
//!     │  WorkerSpec  │   │  WorkerSpec  │
//!     │  (camera 0)  │   │  (camera 1)  │
//!     └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐
//!     │ WorkerActor  │   │ WorkerActor  │      ScanStarted / ScanError /
//!     │ (retry loop) │   │ (retry loop) │      PackObserved / ScanEnded
//!     └──────┬───────┘   └──────┬───────┘
//!            └────────┬─────────┘
//!                     ▼
//!        ┌─────────────────────────┐
//!        │   Bus (bounded mpsc)    │
//!        └────────────┬────────────┘
//!                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor loop                                                  │
//! │  - recv_batch(poll_interval) → EventKernel::push                  │
//! │  - Tick + periodic Refresh* events                                │
//! │  - EventKernel::run(now)                                          │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               ▼
//!  PackResultCorrelator  SettingsRefresh  ActuatorController  SubscriberSet
//!  + PackValidator       (Backend GETs)   (GateOpen/Close)    (per-sub queues)
//!        │                  │                  │               │
//!        │ OutcomeGood/Bad  │ watch<Settings>  │ GateCommand   ├─► BackendNotifier (PUT)
//!        └──► kernel ◄──────┘                  ▼               └─► LogWriter, ...
//!                                         gate driver ─► Actuator
//! ```
//!
//! ### Decision
//! ```text
//! single camera:  PackObserved ─► validate(expected_count) ─► Outcome
//! two cameras:    PackObserved ─► buffer per camera
//!                 Tick: oldest pack older than result_timeout?
//!                   ├─ gather reads within max_camera_skew from both cameras
//!                   ├─ one side has QR codes → validate that side
//!                   ├─ both sides have QR codes → desync warning, earliest side wins
//!                   └─ none → validate(empty) → bad pack
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                              |
//! |-------------------|--------------------------------------------------------------------|-------------------------------------------------|
//! | **Kernel**        | Typed events, class-matched handlers, fault isolation.             | [`EventKernel`], [`Handler`], [`Event`]         |
//! | **Packs**         | Validation and two-camera correlation.                             | [`PackValidator`], [`PackResultCorrelator`]     |
//! | **Gate**          | Debounced reject gate timing.                                      | [`ActuatorController`], [`Actuator`]            |
//! | **Workers**       | Camera workers with restart/backoff policies.                      | [`Scanner`], [`ScannerFn`], [`WorkerSpec`]      |
//! | **Supervision**   | Message ingestion, settings refresh, graceful shutdown.            | [`Supervisor`]                                  |
//! | **Subscribers**   | Outcome fan-out (backend reports, logging, custom).                | [`Subscribe`], [`BackendNotifier`]              |
//! | **Errors**        | Typed errors with stable labels.                                   | [`RuntimeError`], [`WorkerError`], [`HandlerError`] |
//! | **Configuration** | Timings, validation knobs, routing of bad packs.                   | [`Config`]                                      |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber that writes outcomes to `tracing`.
//! - `http` (default): exports [`HttpBackend`], a `reqwest` client for the line backend.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::{Duration, SystemTime};
//! use tokio_util::sync::CancellationToken;
//! use scanvisor::{Config, Outbox, RestartPolicy, ScannerFn, ScannerRef, Subscribe, Supervisor, WorkerError, WorkerSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.poll_interval = Duration::from_millis(20);
//!     cfg.restart = RestartPolicy::Never;
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(scanvisor::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(cfg.clone())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     // A camera that sees one pack and hangs up.
//!     let cam: ScannerRef = ScannerFn::arc("camera-left", |out: Outbox, _ctx: CancellationToken| async move {
//!         let now = SystemTime::now();
//!         out.observe(now, now, ["QR-1", "QR-2"], ["4600000000011", "4600000000028"]).await
//!     });
//!
//!     sup.run(vec![WorkerSpec::with_defaults(cam, &cfg)]).await?;
//!     Ok(())
//! }
//! ```
mod collaborators;
mod core;
mod error;
mod events;
mod gate;
mod packs;
mod policies;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use collaborators::{
    Actuator, Backend, CURRENT_BATCH_PATH, LogActuator, NEW_PACK_PATH, WORK_MODE_PATH,
};
pub use core::{BadPackRouting, Config, EventKernel, Handler, HandlerFn, Supervisor, SupervisorBuilder};
pub use error::{CollaboratorError, HandlerError, RuntimeError, WorkerError};
pub use events::{Bus, Event, EventClass, EventKind, Inbox, Outbox, ScanMessage};
pub use gate::{ActuatorController, ActuatorState, GateCommand, GateCommands, GateTiming, spawn_driver};
pub use packs::{
    CodePair, CodeSet, CorrelationMode, EMPTY_BARCODE, LineSettings, Observation,
    PackResultCorrelator, PackValidator, PendingObservation, SourceId, ValidatedPack, WorkMode,
};
pub use policies::{BackoffPolicy, DEFAULT_BLACKLIST, JitterPolicy, RestartPolicy, ValidationPolicy};
pub use subscribers::{BackendNotifier, Subscribe, SubscriberSet};
pub use workers::{BoxScanFuture, Scanner, ScannerFn, ScannerRef, WorkerSpec};

// Optional: `reqwest` client for the line backend.
// Enable with: `--features http`
#[cfg(feature = "http")]
pub use collaborators::HttpBackend;

// Optional: built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
