use std::sync::Arc;

use crate::collaborators::{Actuator, Backend, LogActuator};
use crate::core::Config;
use crate::subscribers::Subscribe;

use super::supervisor::Supervisor;

/// Builder for a [`Supervisor`] and its collaborators.
///
/// Without a backend the line runs on the configured defaults: no settings
/// refresh and no pack reports. Without an actuator gate commands are only logged.
pub struct SupervisorBuilder {
    cfg: Config,
    backend: Option<Arc<dyn Backend>>,
    actuator: Option<Arc<dyn Actuator>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            backend: None,
            actuator: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the backend that supplies line settings and receives decided packs.
    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the reject gate hardware.
    pub fn with_actuator(mut self, actuator: Arc<dyn Actuator>) -> Self {
        self.actuator = Some(actuator);
        self
    }

    /// Sets extra subscribers for outcome events.
    ///
    /// Each subscriber gets its own bounded queue and worker task.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    pub fn build(self) -> Supervisor {
        Supervisor {
            cfg: self.cfg,
            backend: self.backend,
            actuator: self.actuator.unwrap_or_else(|| Arc::new(LogActuator)),
            subscribers: self.subscribers,
        }
    }
}
