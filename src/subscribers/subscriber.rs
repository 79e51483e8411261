//! # Outcome subscriber trait.
//!
//! [`Subscribe`] is the extension point for reacting to pack outcomes outside the
//! kernel: notifying the backend, writing logs, feeding dashboards.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently of the kernel)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged)
//!
//! ## Architecture
//! ```text
//! OutcomeGood/OutcomeBad ──► SubscriberSet ──► [bounded queue] ──► worker task ──► subscriber.on_event()
//! ```
//!
//! ## Overflow behavior
//! The new event is dropped **for this subscriber only** and a warning is logged.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use scanvisor::{Event, Subscribe};
//!
//! struct RejectCounter(std::sync::atomic::AtomicU64);
//!
//! #[async_trait]
//! impl Subscribe for RejectCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev, Event::OutcomeBad { .. }) {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "reject-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Asynchronous consumer of outcome events.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes one event, in FIFO order per subscriber.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
