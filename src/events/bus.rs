//! # Message bus between camera workers and the supervisor.
//!
//! [`Bus`] is a thin wrapper around a bounded [`tokio::sync::mpsc`] channel of
//! [`ScanMessage`]s. Each worker gets an [`Outbox`] bound to its [`SourceId`];
//! the supervisor owns the single [`Inbox`].
//!
//! ## Architecture
//! ```text
//! Publishers (one per camera):           Consumer (one):
//!   Outbox(camera-0) ──┐
//!                      ├──► Bus ───────► Inbox::recv_batch(poll_interval)
//!   Outbox(camera-1) ──┘  (mpsc)           (in Supervisor loop)
//! ```
//!
//! ## Rules
//! - **Backpressure**: `observe`/`error` await free capacity; a stalled
//!   supervisor slows workers down instead of dropping observations.
//! - **Bounded wait**: `recv_batch` blocks at most `wait`, then drains what is
//!   already queued without waiting further.
//! - **Closed bus**: sending after the supervisor is gone yields
//!   [`WorkerError::Canceled`] so scanners can unwind with `?`.

use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::time;
use tracing::debug;

use crate::error::WorkerError;
use crate::events::ScanMessage;
use crate::packs::{Observation, SourceId};

/// Sending side of the worker channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: mpsc::Sender<ScanMessage>,
}

impl Bus {
    /// Creates a bus with the given capacity (clamped to at least 1).
    pub fn new(capacity: usize) -> (Self, Inbox) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, Inbox { rx })
    }

    /// Returns a sender bound to `source`.
    pub fn outbox(&self, source: SourceId) -> Outbox {
        Outbox {
            source,
            tx: self.tx.clone(),
        }
    }
}

/// Receiving side of the worker channel, owned by the supervisor.
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::Receiver<ScanMessage>,
}

impl Inbox {
    /// Waits up to `wait` for the first message, then drains up to `max` queued ones.
    ///
    /// Returns an empty batch on timeout.
    pub async fn recv_batch(&mut self, wait: Duration, max: usize) -> Vec<ScanMessage> {
        let mut batch = Vec::new();
        match time::timeout(wait, self.rx.recv()).await {
            Ok(Some(msg)) => batch.push(msg),
            Ok(None) | Err(_) => return batch,
        }
        while batch.len() < max.max(1) {
            match self.rx.try_recv() {
                Ok(msg) => batch.push(msg),
                Err(_) => break,
            }
        }
        batch
    }

    /// Takes every message already queued without waiting.
    pub fn drain(&mut self) -> Vec<ScanMessage> {
        let mut batch = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            batch.push(msg);
        }
        batch
    }
}

/// Per-camera sending handle given to a [`Scanner`](crate::Scanner).
#[derive(Clone, Debug)]
pub struct Outbox {
    source: SourceId,
    tx: mpsc::Sender<ScanMessage>,
}

impl Outbox {
    /// Camera this outbox reports for.
    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Reports a pack that left the camera view.
    pub async fn observe<Q, B>(
        &self,
        start_time: SystemTime,
        finish_time: SystemTime,
        qr_codes: Q,
        barcodes: B,
    ) -> Result<(), WorkerError>
    where
        Q: IntoIterator,
        Q::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        let obs = Observation::new(self.source, start_time, finish_time, qr_codes, barcodes);
        self.send(ScanMessage::PackObserved(obs)).await
    }

    /// Reports a non-fatal problem (camera hiccup, decoder error).
    pub async fn error(&self, message: impl Into<String>) -> Result<(), WorkerError> {
        self.send(ScanMessage::ScanError {
            source: self.source,
            message: message.into(),
        })
        .await
    }

    pub(crate) async fn started(&self) -> Result<(), WorkerError> {
        self.send(ScanMessage::ScanStarted {
            source: self.source,
        })
        .await
    }

    /// Non-blocking: the final message must never stall a worker during shutdown.
    pub(crate) fn ended(&self) {
        if let Err(e) = self.tx.try_send(ScanMessage::ScanEnded {
            source: self.source,
        }) {
            debug!(source = %self.source, error = %e, "scan end not queued");
        }
    }

    async fn send(&self, msg: ScanMessage) -> Result<(), WorkerError> {
        self.tx.send(msg).await.map_err(|_| WorkerError::Canceled)
    }
}
