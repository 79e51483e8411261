//! # Worker → supervisor IPC messages.
//!
//! [`ScanMessage`] is the only value camera workers send. It is serde-serializable
//! so an out-of-process worker can speak the same contract over any transport:
//! ```text
//! {"type":"scan_started","source":0}
//! {"type":"scan_ended","source":0}
//! {"type":"scan_error","source":0,"message":"stream lost"}
//! {"type":"pack_observed","source":0,"start_time":..,"finish_time":..,"qr_codes":[..],"barcodes":[..]}
//! ```

use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::packs::{Observation, SourceId};

/// Message sent by a camera worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanMessage {
    ScanStarted { source: SourceId },
    ScanEnded { source: SourceId },
    ScanError { source: SourceId, message: String },
    PackObserved(Observation),
}

impl ScanMessage {
    /// Camera that sent the message.
    pub fn source(&self) -> SourceId {
        match self {
            ScanMessage::ScanStarted { source }
            | ScanMessage::ScanEnded { source }
            | ScanMessage::ScanError { source, .. } => *source,
            ScanMessage::PackObserved(obs) => obs.source,
        }
    }
}

impl From<ScanMessage> for Event {
    fn from(msg: ScanMessage) -> Self {
        match msg {
            ScanMessage::ScanStarted { source } => Event::ScanStarted { source },
            ScanMessage::ScanEnded { source } => Event::ScanEnded { source },
            ScanMessage::ScanError { source, message } => Event::scan_error(source, message),
            ScanMessage::PackObserved(obs) => Event::PackObserved(obs),
        }
    }
}
