//! # Tracing subscriber for pack outcomes.
//!
//! [`LogWriter`] writes every outcome to `tracing`:
//! ```text
//! INFO pack accepted pairs=2 codes=["QR1/4600000000001", "QR2/4600000000002"]
//! WARN pack rejected pairs=2 codes=["empty_1700000000/0000000000000", ...]
//! ```
//! Sink setup is up to the embedding binary.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::events::Event;
use crate::packs::CodePair;
use crate::subscribers::Subscribe;

/// Outcome logger (feature `logging`).
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e {
            Event::OutcomeGood { codepairs } => {
                info!(pairs = codepairs.len(), codes = ?render(codepairs), "pack accepted");
            }
            Event::OutcomeBad { codepairs } => {
                warn!(pairs = codepairs.len(), codes = ?render(codepairs), "pack rejected");
            }
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

fn render(pairs: &[CodePair]) -> Vec<String> {
    pairs.iter().map(|p| format!("{}/{}", p.qr, p.barcode)).collect()
}
