//! Runtime core: the event kernel, worker supervision and shutdown.
//!
//! The public API from this module is [`EventKernel`] with its [`Handler`]
//! trait, the [`Supervisor`] that drives it, and [`Config`].
//!
//! Internal modules:
//! - [`kernel`]: single-threaded typed event dispatch;
//! - [`handlers`]: the handlers the supervisor registers on the kernel;
//! - [`supervisor`]: worker lifecycle, message ingestion, refresh cadence;
//! - [`registry`]: running worker handles;
//! - [`actor`]: one worker with restart policy and backoff;
//! - [`runner`]: one scanner attempt with panic isolation;
//! - [`shutdown`]: OS termination signals.

mod actor;
mod builder;
mod config;
mod handlers;
mod kernel;
mod registry;
mod runner;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::{BadPackRouting, Config};
pub use kernel::{EventKernel, Handler, HandlerFn};
pub use supervisor::Supervisor;
