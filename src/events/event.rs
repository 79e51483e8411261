//! # Events dispatched by the [`EventKernel`](crate::EventKernel).
//!
//! [`Event`] is a tagged variant; each variant has a concrete [`EventKind`].
//! Handlers subscribe to an [`EventClass`] and receive every event whose kind
//! satisfies it. The kind → classes mapping is an explicit static table
//! ([`EventKind::classes`]), there is no inheritance.
//!
//! ## Capability table
//! ```text
//! kind                   classes
//! ScanStarted            Any, Worker, Lifecycle
//! ScanEnded              Any, Worker, Lifecycle
//! ScanError              Any, Worker, Lifecycle
//! PackObserved           Any, Worker
//! RefreshExpectedCount   Any, Scheduled, Refresh
//! RefreshWorkMode        Any, Scheduled, Refresh
//! GateOpen               Any, Scheduled, Gate
//! GateClose              Any, Scheduled, Gate
//! OutcomeGood            Any, Outcome
//! OutcomeBad             Any, Outcome
//! Tick                   Any
//! ```
//! Every kind additionally satisfies `Exact(itself)`.
//!
//! ## Scheduled events
//! Events carrying a due time ([`Event::due_at`]) are re-emitted unchanged by
//! their handler until the due time is reached.
//!
//! ## Example
//! ```rust
//! use std::time::SystemTime;
//! use scanvisor::{Event, EventClass, EventKind};
//!
//! let ev = Event::GateOpen { at: SystemTime::UNIX_EPOCH };
//! assert_eq!(ev.kind(), EventKind::GateOpen);
//! assert!(ev.kind().satisfies(EventClass::Scheduled));
//! assert!(ev.kind().satisfies(EventClass::Gate));
//! assert!(!ev.kind().satisfies(EventClass::Outcome));
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use crate::packs::{CodePair, Observation, SourceId};

/// Concrete event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// Camera worker started an attempt.
    ScanStarted,
    /// Camera worker exited for good.
    ScanEnded,
    /// Camera worker attempt failed.
    ScanError,

    // === Worker data ===
    /// A pack passed a camera.
    PackObserved,

    // === Scheduled ===
    /// Ask the backend for the expected codes count once due.
    RefreshExpectedCount,
    /// Ask the backend for the line work mode once due.
    RefreshWorkMode,
    /// Open the reject gate once due.
    GateOpen,
    /// Close the reject gate once due.
    GateClose,

    // === Outcomes ===
    /// Pack accepted.
    OutcomeGood,
    /// Pack rejected.
    OutcomeBad,

    /// Supervisor heartbeat, one per loop pass.
    Tick,
}

/// Abstract class a handler can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// Every event.
    Any,
    /// Lifecycle events and observations from camera workers.
    Worker,
    /// `ScanStarted`, `ScanEnded`, `ScanError`.
    Lifecycle,
    /// Every event carrying a due time.
    Scheduled,
    /// Backend refresh requests.
    Refresh,
    /// Reject gate commands.
    Gate,
    /// Pack outcomes.
    Outcome,
    /// Exactly one concrete kind.
    Exact(EventKind),
}

use EventClass::{Any, Gate, Lifecycle, Outcome, Refresh, Scheduled, Worker};

const LIFECYCLE: &[EventClass] = &[Any, Worker, Lifecycle];
const OBSERVATION: &[EventClass] = &[Any, Worker];
const REFRESH: &[EventClass] = &[Any, Scheduled, Refresh];
const GATE: &[EventClass] = &[Any, Scheduled, Gate];
const OUTCOME: &[EventClass] = &[Any, Outcome];
const HEARTBEAT: &[EventClass] = &[Any];

impl EventKind {
    /// Abstract classes this kind satisfies (excluding `Exact`).
    pub fn classes(self) -> &'static [EventClass] {
        match self {
            EventKind::ScanStarted | EventKind::ScanEnded | EventKind::ScanError => LIFECYCLE,
            EventKind::PackObserved => OBSERVATION,
            EventKind::RefreshExpectedCount | EventKind::RefreshWorkMode => REFRESH,
            EventKind::GateOpen | EventKind::GateClose => GATE,
            EventKind::OutcomeGood | EventKind::OutcomeBad => OUTCOME,
            EventKind::Tick => HEARTBEAT,
        }
    }

    /// Whether a handler registered for `class` receives events of this kind.
    #[inline]
    pub fn satisfies(self, class: EventClass) -> bool {
        match class {
            EventClass::Exact(kind) => kind == self,
            other => self.classes().contains(&other),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::ScanStarted => "scan_started",
            EventKind::ScanEnded => "scan_ended",
            EventKind::ScanError => "scan_error",
            EventKind::PackObserved => "pack_observed",
            EventKind::RefreshExpectedCount => "refresh_expected_count",
            EventKind::RefreshWorkMode => "refresh_work_mode",
            EventKind::GateOpen => "gate_open",
            EventKind::GateClose => "gate_close",
            EventKind::OutcomeGood => "outcome_good",
            EventKind::OutcomeBad => "outcome_bad",
            EventKind::Tick => "tick",
        }
    }
}

/// Event flowing through the kernel queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ScanStarted {
        source: SourceId,
    },
    ScanEnded {
        source: SourceId,
    },
    ScanError {
        source: SourceId,
        message: Arc<str>,
    },
    PackObserved(Observation),
    RefreshExpectedCount {
        due_at: SystemTime,
    },
    RefreshWorkMode {
        due_at: SystemTime,
    },
    GateOpen {
        at: SystemTime,
    },
    GateClose {
        at: SystemTime,
    },
    OutcomeGood {
        codepairs: Vec<CodePair>,
    },
    OutcomeBad {
        codepairs: Vec<CodePair>,
    },
    Tick {
        now: SystemTime,
    },
}

impl Event {
    /// Concrete kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ScanStarted { .. } => EventKind::ScanStarted,
            Event::ScanEnded { .. } => EventKind::ScanEnded,
            Event::ScanError { .. } => EventKind::ScanError,
            Event::PackObserved(_) => EventKind::PackObserved,
            Event::RefreshExpectedCount { .. } => EventKind::RefreshExpectedCount,
            Event::RefreshWorkMode { .. } => EventKind::RefreshWorkMode,
            Event::GateOpen { .. } => EventKind::GateOpen,
            Event::GateClose { .. } => EventKind::GateClose,
            Event::OutcomeGood { .. } => EventKind::OutcomeGood,
            Event::OutcomeBad { .. } => EventKind::OutcomeBad,
            Event::Tick { .. } => EventKind::Tick,
        }
    }

    /// Due time of scheduled events, `None` for everything else.
    pub fn due_at(&self) -> Option<SystemTime> {
        match self {
            Event::RefreshExpectedCount { due_at } | Event::RefreshWorkMode { due_at } => {
                Some(*due_at)
            }
            Event::GateOpen { at } | Event::GateClose { at } => Some(*at),
            _ => None,
        }
    }

    /// Camera the event originates from, for worker events.
    pub fn source(&self) -> Option<SourceId> {
        match self {
            Event::ScanStarted { source }
            | Event::ScanEnded { source }
            | Event::ScanError { source, .. } => Some(*source),
            Event::PackObserved(obs) => Some(obs.source),
            _ => None,
        }
    }

    /// Whether this scheduled event has reached its due time at `now`.
    ///
    /// Events without a due time are always due.
    #[inline]
    pub fn is_due(&self, now: SystemTime) -> bool {
        self.due_at().is_none_or(|at| now >= at)
    }

    /// Creates a lifecycle error event.
    #[inline]
    pub fn scan_error(source: SourceId, message: impl Into<Arc<str>>) -> Self {
        Event::ScanError {
            source,
            message: message.into(),
        }
    }
}
