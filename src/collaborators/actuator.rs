//! # Reject gate actuator.
//!
//! [`Actuator`] is the physical device that pushes bad packs off the line.
//! The [`ActuatorController`](crate::ActuatorController) decides *when*; the
//! actuator only executes `open`/`close`.

use async_trait::async_trait;
use tracing::info;

use crate::error::CollaboratorError;

/// Physical reject gate.
#[async_trait]
pub trait Actuator: Send + Sync + 'static {
    async fn open(&self) -> Result<(), CollaboratorError>;
    async fn close(&self) -> Result<(), CollaboratorError>;
}

/// Actuator that only logs commands; used when no gate is wired.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogActuator;

#[async_trait]
impl Actuator for LogActuator {
    async fn open(&self) -> Result<(), CollaboratorError> {
        info!(command = "open", "reject gate");
        Ok(())
    }

    async fn close(&self) -> Result<(), CollaboratorError> {
        info!(command = "close", "reject gate");
        Ok(())
    }
}
