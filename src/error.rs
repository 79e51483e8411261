//! Error types used by the scanvisor runtime, its handlers and collaborators.
//!
//! This module defines four enums:
//!
//! - [`RuntimeError`]: errors raised by the supervisor itself.
//! - [`WorkerError`]: errors raised by a single scanner attempt.
//! - [`HandlerError`]: faults caught at the event kernel boundary.
//! - [`CollaboratorError`]: transient failures of the backend or the gate actuator.
//!
//! Every type provides `as_label` for logs; none of them is ever allowed to
//! escape the supervisor loop except [`RuntimeError`] on shutdown.

use std::any::Any;
use std::time::Duration;

use thiserror::Error;

use crate::packs::SourceId;

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers did not stop and were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the workers that did not stop in time.
        stuck: Vec<String>,
    },

    /// `run` was called without any worker to supervise.
    #[error("no workers to supervise")]
    NoWorkers,

    /// More workers than the correlator has buffers for.
    #[error("{count} workers requested; at most 2 camera sources are supported")]
    TooManyWorkers {
        /// Number of worker specs passed to `run`.
        count: usize,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use scanvisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::NoWorkers.as_label(), "runtime_no_workers");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::NoWorkers => "runtime_no_workers",
            RuntimeError::TooManyWorkers { .. } => "runtime_too_many_workers",
        }
    }
}

/// # Errors produced by a scanner attempt.
///
/// `Fail` is retried according to the worker's restart policy, `Fatal` never is.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Non-recoverable error (camera misconfigured, model missing...).
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Attempt failed but may succeed if retried (stream dropped, decoder hiccup).
    #[error("scan failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Attempt stopped because the supervisor cancelled it.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Indicates whether the restart policy may retry after this error.
    ///
    /// # Example
    /// ```
    /// use scanvisor::WorkerError;
    ///
    /// assert!(WorkerError::Fail { error: "stream lost".into() }.is_retryable());
    /// assert!(!WorkerError::Fatal { error: "bad url".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Fail { .. })
    }
}

/// # Faults caught at the event kernel dispatch boundary.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler returned an error for the event.
    #[error("handler fault: {message}")]
    Fault {
        /// Human-readable description.
        message: String,
    },

    /// Handler panicked; the panic payload is rendered into `message`.
    #[error("handler panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// Observation came from a source the correlator has no buffer for.
    #[error("observation from unknown source {id}")]
    UnknownSource {
        /// Offending source id.
        id: SourceId,
    },
}

impl HandlerError {
    /// Builds a [`HandlerError::Fault`] from any displayable message.
    pub fn fault(message: impl Into<String>) -> Self {
        HandlerError::Fault {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fault { .. } => "handler_fault",
            HandlerError::Panicked { .. } => "handler_panicked",
            HandlerError::UnknownSource { .. } => "handler_unknown_source",
        }
    }
}

/// # Transient failures of external collaborators.
///
/// Never retried on the spot: the refresh cadence or the next outcome is the retry.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// Request could not be sent or timed out.
    #[error("request to {endpoint} failed: {message}")]
    Request {
        /// Endpoint path or command name.
        endpoint: &'static str,
        /// Transport error text.
        message: String,
    },

    /// Backend answered with a non-success status.
    #[error("{endpoint} answered with status {status}")]
    Status {
        /// Endpoint path.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
    },

    /// Backend answered with a body that does not match the payload contract.
    #[error("{endpoint} returned an unexpected payload: {message}")]
    Payload {
        /// Endpoint path.
        endpoint: &'static str,
        /// Decoding error text.
        message: String,
    },

    /// Gate actuator rejected or failed a command.
    #[error("actuator command {command} failed: {message}")]
    Actuator {
        /// `open` or `close`.
        command: &'static str,
        /// Device error text.
        message: String,
    },
}

impl CollaboratorError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            CollaboratorError::Request { .. } => "collaborator_request",
            CollaboratorError::Status { .. } => "collaborator_status",
            CollaboratorError::Payload { .. } => "collaborator_payload",
            CollaboratorError::Actuator { .. } => "collaborator_actuator",
        }
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
