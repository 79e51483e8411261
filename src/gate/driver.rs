//! # Gate driver: executes gate commands against the [`Actuator`].
//!
//! The controller never awaits hardware. Commands are queued and executed by
//! one task, strictly in order, so an `open` is never overtaken by its `close`.
//! The task ends when every [`GateCommands`](super::GateCommands) sender is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

use super::GateCommand;
use crate::collaborators::Actuator;

/// Spawns the driver task for `actuator`.
pub fn spawn_driver(
    actuator: Arc<dyn Actuator>,
    mut commands: mpsc::UnboundedReceiver<GateCommand>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(cmd) = commands.recv().await {
            let res = match cmd {
                GateCommand::Open => actuator.open().await,
                GateCommand::Close => actuator.close().await,
            };
            if let Err(e) = res {
                error!(command = cmd.as_label(), label = e.as_label(), error = %e, "gate command failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::CollaboratorError;

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<&'static str>>,
    }

    #[async_trait]
    impl Actuator for Recording {
        async fn open(&self) -> Result<(), CollaboratorError> {
            self.calls.lock().unwrap().push("open");
            Err(CollaboratorError::Actuator {
                command: "open",
                message: "relay stuck".into(),
            })
        }

        async fn close(&self) -> Result<(), CollaboratorError> {
            self.calls.lock().unwrap().push("close");
            Ok(())
        }
    }

    #[tokio::test]
    async fn commands_run_in_order_despite_failures() {
        let actuator = Arc::new(Recording::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = spawn_driver(actuator.clone(), rx);

        tx.send(GateCommand::Open).unwrap();
        tx.send(GateCommand::Close).unwrap();
        tx.send(GateCommand::Open).unwrap();
        drop(tx);
        driver.await.unwrap();

        assert_eq!(*actuator.calls.lock().unwrap(), vec!["open", "close", "open"]);
    }
}
