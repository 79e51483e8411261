//! # Backend notification of decided packs.
//!
//! [`BackendNotifier`] reports every pair of a good pack to the [`Backend`].
//! Bad packs are reported too when the [`BadPackRouting`] says so; otherwise
//! only the gate deals with them.
//!
//! A failed report is logged and not retried.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::collaborators::Backend;
use crate::core::BadPackRouting;
use crate::events::Event;
use crate::subscribers::Subscribe;

pub struct BackendNotifier {
    backend: Arc<dyn Backend>,
    routing: BadPackRouting,
}

impl BackendNotifier {
    pub fn new(backend: Arc<dyn Backend>, routing: BadPackRouting) -> Self {
        Self { backend, routing }
    }
}

#[async_trait]
impl Subscribe for BackendNotifier {
    async fn on_event(&self, e: &Event) {
        let codepairs = match e {
            Event::OutcomeGood { codepairs } => codepairs,
            Event::OutcomeBad { codepairs } if self.routing.sends_codes() => codepairs,
            _ => return,
        };
        for pair in codepairs {
            match self.backend.send_codepair(pair).await {
                Ok(()) => debug!(qr = %pair.qr, barcode = %pair.barcode, "pair reported"),
                Err(err) => warn!(
                    qr = %pair.qr,
                    label = err.as_label(),
                    error = %err,
                    "pair not reported"
                ),
            }
        }
    }

    fn name(&self) -> &'static str {
        "backend-notifier"
    }
}
