//! Reject gate: debounced state machine and the command driver.
//!
//! ```text
//! OutcomeBad / GateOpen / GateClose ──► ActuatorController ──► GateCommand ──► driver task ──► Actuator
//!                                        (kernel handler)      (mpsc, FIFO)
//! ```

mod controller;
mod driver;

pub use controller::{ActuatorController, ActuatorState, GateCommand, GateCommands, GateTiming};
pub use driver::spawn_driver;
