//! Policies: worker restarts and pack validation.
//!
//! ## Contents
//! - [`RestartPolicy`] when to restart a camera worker (never / on-failure / always)
//! - [`BackoffPolicy`] how reconnect delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization so cameras do not reconnect in lockstep
//! - [`ValidationPolicy`] what to do with packs that carry the wrong number of codes
//!
//! ## Quick wiring
//! ```text
//! WorkerSpec { scanner, restart: RestartPolicy, backoff: BackoffPolicy }
//!      └─► core::actor::WorkerActor uses:
//!           - restart to decide continue/exit
//!           - backoff.next(attempt) to delay the next attempt
//!
//! Config.validation: ValidationPolicy
//!      └─► PackValidator
//! ```
//!
//! ## Defaults
//! - `RestartPolicy::Always { interval: None }`: cameras are long-running, a returning
//!   scanner is reconnected immediately.
//! - `BackoffPolicy::default()` → first=500ms, factor=2.0, max=30s, jitter=Equal.
//! - `ValidationPolicy::default()` → strict, replace rejected packs, blacklist `xps.tn.ru`.

mod backoff;
mod jitter;
mod restart;
mod validation;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
pub use validation::{DEFAULT_BLACKLIST, ValidationPolicy};
