//! # Outcome subscribers.
//!
//! Pack outcomes leave the kernel through the [`SubscriberSet`], which hands each
//! event to every [`Subscribe`] implementation on its own task.
//!
//! ## Architecture
//! ```text
//! EventKernel ── Outcome class handler ──► SubscriberSet::emit(&Event)
//!                                              │
//!                                   ┌──────────┼──────────────┐
//!                                   ▼          ▼              ▼
//!                           BackendNotifier  LogWriter     custom ...
//! ```
//!
//! - [`BackendNotifier`] PUTs code pairs to the backend (added by the supervisor
//!   when a backend is configured).
//! - [`LogWriter`] (feature `logging`) writes outcomes to `tracing`.

#[cfg(feature = "logging")]
mod log;
mod notifier;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use notifier::BackendNotifier;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
