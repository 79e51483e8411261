//! # Restart policies for camera workers.
//!
//! A camera worker normally runs forever; [`RestartPolicy`] decides what happens
//! when its scanner returns anyway.
//!
//! ```text
//! RestartPolicy::Always { interval: None }      → stream ended → reconnect now (default)
//! RestartPolicy::Always { interval: Some(d) }   → stream ended → wait d → reconnect
//! RestartPolicy::OnFailure                      → reconnect only after Fail
//! RestartPolicy::Never                          → one attempt, then ScanEnded
//! ```
//! `WorkerError::Fatal` ends the worker regardless of the policy.

use std::time::Duration;

/// Policy controlling whether a worker is restarted after its scanner returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartPolicy {
    Never,
    OnFailure,
    /// `interval`: pause after a clean return before reconnecting.
    Always { interval: Option<Duration> },
}

impl RestartPolicy {
    /// Whether a scanner that returned `Ok` is started again.
    #[inline]
    pub fn after_success(&self) -> bool {
        matches!(self, RestartPolicy::Always { .. })
    }

    /// Whether a scanner that returned `Fail` is started again.
    #[inline]
    pub fn after_failure(&self) -> bool {
        !matches!(self, RestartPolicy::Never)
    }

    /// Pause before restarting after a clean return.
    pub fn success_interval(&self) -> Duration {
        match self {
            RestartPolicy::Always {
                interval: Some(interval),
            } => *interval,
            _ => Duration::ZERO,
        }
    }
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy::Always { interval: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table() {
        let always = RestartPolicy::default();
        assert!(always.after_success() && always.after_failure());
        assert!(!RestartPolicy::OnFailure.after_success());
        assert!(RestartPolicy::OnFailure.after_failure());
        assert!(!RestartPolicy::Never.after_failure());
    }

    #[test]
    fn interval_only_applies_to_always() {
        let d = Duration::from_secs(3);
        assert_eq!(RestartPolicy::Always { interval: Some(d) }.success_interval(), d);
        assert_eq!(RestartPolicy::OnFailure.success_interval(), Duration::ZERO);
    }
}
