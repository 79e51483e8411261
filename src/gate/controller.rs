//! # ActuatorController: debounced reject gate.
//!
//! Bad packs reach the gate `before` after they were decided; the gate must then
//! stay open for `open`. Overlapping bad packs extend the open window instead of
//! flapping the gate.
//!
//! ## States
//! ```text
//!             OutcomeBad                GateOpen due              GateClose due
//!   Closed ──────────────► PendingOpen ──────────────► Open ──────────────────► Closed
//!     emit GateOpen{open_at}   │  (open command)        │ emit GateClose{close_at}
//!                              │                        │ (close command)
//!         OutcomeBad: close_at = max(close_at, now + before + open)
//! ```
//!
//! ## Rules
//! - `GateOpen`/`GateClose` that are not due are re-emitted; `GateClose` always
//!   carries the current (possibly extended) close time.
//! - Stale gate events that do not match the state are dropped.
//! - The scheduled close time never moves backwards.
//! - Commands go to the gate driver in order; their failures do not affect the state.

use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::Handler;
use crate::error::HandlerError;
use crate::events::Event;

/// Physical command for the reject gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateCommand {
    Open,
    Close,
}

impl GateCommand {
    pub fn as_label(self) -> &'static str {
        match self {
            GateCommand::Open => "open",
            GateCommand::Close => "close",
        }
    }
}

/// Sending side of the gate command queue.
pub type GateCommands = mpsc::UnboundedSender<GateCommand>;

/// Reject gate timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateTiming {
    /// Travel time from the decision point to the gate.
    pub before: Duration,
    /// How long the gate stays open for one bad pack.
    pub open: Duration,
}

/// Observable controller state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActuatorState {
    pub is_open: bool,
    /// Close time of the current, or last, open cycle.
    pub scheduled_close_at: Option<SystemTime>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Closed,
    PendingOpen { open_at: SystemTime },
    Open,
}

/// Gate state machine, registered for `OutcomeBad` and the `Gate` class.
pub struct ActuatorController {
    timing: GateTiming,
    phase: Phase,
    close_at: Option<SystemTime>,
    commands: GateCommands,
}

impl ActuatorController {
    pub fn new(timing: GateTiming, commands: GateCommands) -> Self {
        Self {
            timing,
            phase: Phase::Closed,
            close_at: None,
            commands,
        }
    }

    pub fn state(&self) -> ActuatorState {
        ActuatorState {
            is_open: self.phase == Phase::Open,
            scheduled_close_at: self.close_at,
        }
    }

    fn on_bad(&mut self, now: SystemTime) -> Vec<Event> {
        let close_at = now + self.timing.before + self.timing.open;
        match self.phase {
            Phase::Closed => {
                let open_at = now + self.timing.before;
                self.phase = Phase::PendingOpen { open_at };
                self.extend_close(close_at);
                debug!(?open_at, ?close_at, "gate open scheduled");
                vec![Event::GateOpen { at: open_at }]
            }
            Phase::PendingOpen { .. } | Phase::Open => {
                self.extend_close(close_at);
                debug!(close_at = ?self.close_at, "gate close extended");
                Vec::new()
            }
        }
    }

    fn on_open(&mut self, at: SystemTime, now: SystemTime) -> Vec<Event> {
        match self.phase {
            Phase::PendingOpen { open_at } if open_at == at => {
                if now < at {
                    return vec![Event::GateOpen { at }];
                }
                self.phase = Phase::Open;
                self.command(GateCommand::Open);
                match self.close_at {
                    Some(close_at) => vec![Event::GateClose { at: close_at }],
                    None => Vec::new(),
                }
            }
            _ => {
                debug!(?at, "stale gate open dropped");
                Vec::new()
            }
        }
    }

    fn on_close(&mut self, at: SystemTime, now: SystemTime) -> Vec<Event> {
        let (Phase::Open, Some(close_at)) = (self.phase, self.close_at) else {
            debug!(?at, "stale gate close dropped");
            return Vec::new();
        };
        if now < close_at {
            return vec![Event::GateClose { at: close_at }];
        }
        self.phase = Phase::Closed;
        self.command(GateCommand::Close);
        Vec::new()
    }

    fn extend_close(&mut self, candidate: SystemTime) {
        self.close_at = Some(self.close_at.map_or(candidate, |c| c.max(candidate)));
    }

    fn command(&self, cmd: GateCommand) {
        info!(command = cmd.as_label(), "reject gate");
        if self.commands.send(cmd).is_err() {
            warn!(command = cmd.as_label(), "gate driver is gone; command not executed");
        }
    }
}

impl Handler for ActuatorController {
    fn name(&self) -> &str {
        "actuator-controller"
    }

    fn handle(&mut self, event: &Event, now: SystemTime) -> Result<Vec<Event>, HandlerError> {
        Ok(match event {
            Event::OutcomeBad { .. } => self.on_bad(now),
            Event::GateOpen { at } => self.on_open(*at, now),
            Event::GateClose { at } => self.on_close(*at, now),
            _ => Vec::new(),
        })
    }

    /// Closes an open gate; a pending open is abandoned.
    fn on_stop(&mut self) {
        if self.phase == Phase::Open {
            self.command(GateCommand::Close);
        }
        self.phase = Phase::Closed;
        self.close_at = None;
    }
}
