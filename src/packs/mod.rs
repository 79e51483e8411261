//! Packs: data model, validation and cross-camera correlation.
//!
//! ## Contents
//! - [`Observation`], [`CodeSet`], [`CodePair`], [`ValidatedPack`], [`LineSettings`] data model
//! - [`PackValidator`] pure accept/reject decision for one pack
//! - [`PackResultCorrelator`] joins per-camera observations into pack outcomes
//!
//! ## Quick wiring
//! ```text
//! PackObserved ──► PackResultCorrelator::enqueue(obs, line settings)
//! Tick ──────────► PackResultCorrelator::drain_ready(now)
//!                        └─► PackValidator::validate ──► OutcomeGood / OutcomeBad
//! ```

mod correlator;
mod model;
mod validator;

pub use correlator::{CorrelationMode, PackResultCorrelator};
pub use model::{
    CodePair, CodeSet, LineSettings, Observation, PendingObservation, SourceId, ValidatedPack,
    WorkMode,
};
pub use validator::{EMPTY_BARCODE, PackValidator};
