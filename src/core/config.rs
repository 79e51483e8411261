//! # Line supervisor configuration.
//!
//! Provides [`Config`]: every timing and policy the supervisor needs, threaded
//! through constructors. Loading it from files or the environment is the
//! embedding binary's job.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **WorkerSpec defaults**: `WorkerSpec::with_defaults(scanner, &config)`
//!
//! ## Sentinel values
//! - `refresh_every = 0` → never ask the backend for line settings

use std::time::Duration;

use crate::gate::GateTiming;
use crate::packs::{LineSettings, WorkMode};
use crate::policies::{BackoffPolicy, RestartPolicy, ValidationPolicy};

/// What happens to packs that fail validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BadPackRouting {
    /// Push the pack off the line; the backend never hears of it.
    #[default]
    DropOnly,
    /// Report the codes to the backend; the gate stays closed.
    SendCodesOnly,
    /// Both.
    DropAndSendCodes,
}

impl BadPackRouting {
    /// Whether bad packs drive the reject gate.
    pub fn drops(self) -> bool {
        matches!(
            self,
            BadPackRouting::DropOnly | BadPackRouting::DropAndSendCodes
        )
    }

    /// Whether bad pack codes are reported to the backend.
    pub fn sends_codes(self) -> bool {
        matches!(
            self,
            BadPackRouting::SendCodesOnly | BadPackRouting::DropAndSendCodes
        )
    }
}

/// Configuration of the line supervisor.
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over reading sentinels directly.
#[derive(Clone, Debug)]
pub struct Config {
    /// How long an observation waits for the other camera before a decision.
    pub result_timeout: Duration,
    /// Maximum distance between finish times of two reads of the same pack.
    pub max_camera_skew: Duration,
    /// Travel time from the decision point to the reject gate.
    pub shutter_before: Duration,
    /// How long the gate stays open for one bad pack.
    pub shutter_open: Duration,
    /// Pack validation knobs.
    pub validation: ValidationPolicy,
    /// Expected codes count until the backend answers.
    pub default_expected_count: usize,
    /// Work mode until the backend answers.
    pub default_work_mode: WorkMode,
    /// Maximum wait for worker messages per loop pass.
    pub poll_interval: Duration,
    /// Loop passes between backend refreshes (`0` = never).
    pub refresh_every: u32,
    /// Maximum wait for workers to stop on shutdown.
    pub grace: Duration,
    /// Capacity of the worker message channel (min 1).
    pub bus_capacity: usize,
    /// Default restart policy for camera workers.
    pub restart: RestartPolicy,
    /// Default reconnect backoff for camera workers.
    pub backoff: BackoffPolicy,
    /// Destination of bad packs.
    pub bad_pack_routing: BadPackRouting,
}

impl Config {
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Loop passes between refreshes, `None` if refreshing is disabled.
    #[inline]
    pub fn refresh_period(&self) -> Option<u32> {
        if self.refresh_every == 0 {
            None
        } else {
            Some(self.refresh_every)
        }
    }

    pub fn gate_timing(&self) -> GateTiming {
        GateTiming {
            before: self.shutter_before,
            open: self.shutter_open,
        }
    }

    /// Line settings in force before the first successful refresh.
    pub fn initial_settings(&self) -> LineSettings {
        LineSettings {
            expected_count: self.default_expected_count,
            work_mode: self.default_work_mode.clone(),
        }
    }
}

impl Default for Config {
    /// Defaults match a two-camera line:
    ///
    /// - `result_timeout = 20s`, `max_camera_skew = 4s`
    /// - `shutter_before = 8s`, `shutter_open = 16s`
    /// - `default_expected_count = 2`, `default_work_mode = auto`
    /// - `poll_interval = 1.5s`, `refresh_every = 15`
    /// - `grace = 10s`, `bus_capacity = 1024`
    /// - `bad_pack_routing = DropOnly`
    fn default() -> Self {
        Self {
            result_timeout: Duration::from_secs(20),
            max_camera_skew: Duration::from_secs(4),
            shutter_before: Duration::from_secs(8),
            shutter_open: Duration::from_secs(16),
            validation: ValidationPolicy::default(),
            default_expected_count: 2,
            default_work_mode: WorkMode::Auto,
            poll_interval: Duration::from_millis(1500),
            refresh_every: 15,
            grace: Duration::from_secs(10),
            bus_capacity: 1024,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
            bad_pack_routing: BadPackRouting::default(),
        }
    }
}
