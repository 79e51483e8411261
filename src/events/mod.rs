//! Events: kernel event model, worker messages and the worker bus.
//!
//! ## Contents
//! - [`Event`], [`EventKind`], [`EventClass`] kernel events and the capability table
//! - [`ScanMessage`] serde contract for worker → supervisor messages
//! - [`Bus`], [`Inbox`], [`Outbox`] thin wrapper over `tokio::sync::mpsc`
//!
//! ## Quick reference
//! - **Publishers**: `WorkerActor` (lifecycle), `Scanner` implementations (observations/errors).
//! - **Consumer**: the `Supervisor` loop, which converts messages into [`Event`]s
//!   and feeds them to the `EventKernel`.

mod bus;
mod event;
mod message;

pub use bus::{Bus, Inbox, Outbox};
pub use event::{Event, EventClass, EventKind};
pub use message::ScanMessage;
