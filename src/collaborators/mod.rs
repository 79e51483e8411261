//! External collaborators: the line backend and the reject gate actuator.

mod actuator;
mod backend;

pub use actuator::{Actuator, LogActuator};
#[cfg(feature = "http")]
pub use backend::HttpBackend;
pub use backend::{Backend, CURRENT_BATCH_PATH, NEW_PACK_PATH, WORK_MODE_PATH};
