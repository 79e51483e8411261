//! # Kernel handlers wired by the supervisor.
//!
//! ```text
//! class                          handler
//! PackObserved, Tick             Correlation      enqueue / drain_ready → outcomes
//! Refresh                        SettingsRefresh  backend call on a task → watch channel
//! Lifecycle                      LifecycleLog     tracing
//! Outcome                        OutcomeFanout    SubscriberSet::emit
//! OutcomeBad (routed), Gate      ActuatorController (see gate)
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::collaborators::Backend;
use crate::core::Handler;
use crate::error::HandlerError;
use crate::events::Event;
use crate::packs::{LineSettings, PackResultCorrelator};
use crate::subscribers::SubscriberSet;

/// Feeds observations to the correlator and drains ready packs.
pub(crate) struct Correlation {
    correlator: PackResultCorrelator,
    settings: watch::Receiver<LineSettings>,
}

impl Correlation {
    pub(crate) fn new(
        correlator: PackResultCorrelator,
        settings: watch::Receiver<LineSettings>,
    ) -> Self {
        Self {
            correlator,
            settings,
        }
    }
}

impl Handler for Correlation {
    fn name(&self) -> &str {
        "correlation"
    }

    fn handle(&mut self, event: &Event, now: SystemTime) -> Result<Vec<Event>, HandlerError> {
        if let Event::PackObserved(obs) = event {
            let settings = self.settings.borrow().clone();
            self.correlator.enqueue(obs.clone(), &settings)?;
            debug!(
                source = %obs.source,
                qr = obs.qr_codes.len(),
                barcodes = obs.barcodes.len(),
                pending = self.correlator.pending(),
                "observation buffered"
            );
        }
        Ok(self.correlator.drain_ready(now))
    }

    fn on_stop(&mut self) {
        let pending = self.correlator.pending();
        if pending > 0 {
            warn!(pending, "stopping with undecided observations; they are dropped");
        }
    }
}

/// Refreshes line settings from the backend.
///
/// The backend call runs on its own task; the kernel never waits for it. While a
/// call of the same kind is in flight, further requests are skipped. Failures keep
/// the last known-good value.
pub(crate) struct SettingsRefresh {
    backend: Arc<dyn Backend>,
    settings: Arc<watch::Sender<LineSettings>>,
    count_call: Option<JoinHandle<()>>,
    mode_call: Option<JoinHandle<()>>,
}

impl SettingsRefresh {
    pub(crate) fn new(backend: Arc<dyn Backend>, settings: watch::Sender<LineSettings>) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
            count_call: None,
            mode_call: None,
        }
    }

    fn refresh_count(&mut self) {
        if in_flight(&self.count_call) {
            debug!("expected count refresh still in flight; skipped");
            return;
        }
        let backend = Arc::clone(&self.backend);
        let settings = Arc::clone(&self.settings);
        self.count_call = Some(tokio::spawn(async move {
            match backend.expected_codes_count().await {
                Ok(count) => {
                    settings.send_if_modified(|s| {
                        let changed = s.expected_count != count;
                        if changed {
                            info!(from = s.expected_count, to = count, "expected codes count updated");
                            s.expected_count = count;
                        }
                        changed
                    });
                }
                Err(e) => warn!(
                    label = e.as_label(),
                    error = %e,
                    "expected count refresh failed; keeping last value"
                ),
            }
        }));
    }

    fn refresh_mode(&mut self) {
        if in_flight(&self.mode_call) {
            debug!("work mode refresh still in flight; skipped");
            return;
        }
        let backend = Arc::clone(&self.backend);
        let settings = Arc::clone(&self.settings);
        self.mode_call = Some(tokio::spawn(async move {
            match backend.work_mode().await {
                Ok(mode) => {
                    settings.send_if_modified(|s| {
                        let changed = s.work_mode != mode;
                        if changed {
                            info!(from = %s.work_mode, to = %mode, "work mode updated");
                            s.work_mode = mode;
                        }
                        changed
                    });
                }
                Err(e) => warn!(
                    label = e.as_label(),
                    error = %e,
                    "work mode refresh failed; keeping last value"
                ),
            }
        }));
    }
}

fn in_flight(call: &Option<JoinHandle<()>>) -> bool {
    call.as_ref().is_some_and(|h| !h.is_finished())
}

impl Handler for SettingsRefresh {
    fn name(&self) -> &str {
        "settings-refresh"
    }

    fn handle(&mut self, event: &Event, now: SystemTime) -> Result<Vec<Event>, HandlerError> {
        if !event.is_due(now) {
            return Ok(vec![event.clone()]);
        }
        match event {
            Event::RefreshExpectedCount { .. } => self.refresh_count(),
            Event::RefreshWorkMode { .. } => self.refresh_mode(),
            _ => {}
        }
        Ok(Vec::new())
    }
}

/// Logs worker lifecycle events.
pub(crate) struct LifecycleLog;

impl Handler for LifecycleLog {
    fn name(&self) -> &str {
        "lifecycle-log"
    }

    fn handle(&mut self, event: &Event, _now: SystemTime) -> Result<Vec<Event>, HandlerError> {
        match event {
            Event::ScanStarted { source } => info!(%source, "camera worker started"),
            Event::ScanEnded { source } => info!(%source, "camera worker ended"),
            Event::ScanError { source, message } => {
                warn!(%source, error = %message, "camera worker error")
            }
            _ => {}
        }
        Ok(Vec::new())
    }
}

/// Hands outcome events to the subscribers.
pub(crate) struct OutcomeFanout {
    subs: Arc<SubscriberSet>,
}

impl OutcomeFanout {
    pub(crate) fn new(subs: Arc<SubscriberSet>) -> Self {
        Self { subs }
    }
}

impl Handler for OutcomeFanout {
    fn name(&self) -> &str {
        "outcome-fanout"
    }

    fn handle(&mut self, event: &Event, _now: SystemTime) -> Result<Vec<Event>, HandlerError> {
        self.subs.emit(event);
        Ok(Vec::new())
    }
}
