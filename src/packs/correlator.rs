//! # Correlation of camera observations into pack outcomes.
//!
//! [`PackResultCorrelator`] buffers [`Observation`]s per camera and turns them
//! into `OutcomeGood`/`OutcomeBad` events once they are old enough that every
//! camera had a chance to report the same pack.
//!
//! ## Dual camera
//! ```text
//! drain_ready(now):
//!   loop {
//!     pop paired fronts
//!     candidate = front with the earliest finish_time (ties: lower source)
//!     stop unless now - candidate.finish_time > result_timeout
//!     group = every unpaired observation, any buffer,
//!             with |finish_time - candidate.finish_time| <= max_skew
//!     mark group paired, pop candidate
//!     neither side read a QR  → OutcomeBad (empty pack)
//!     one side read QR codes  → validate that side
//!     both sides read QR      → desync; side whose first QR-bearing
//!                               observation was buffered first wins
//!   }
//! ```
//!
//! ## Single camera
//! Every buffered observation is validated on the next drain.
//!
//! ## Work mode
//! Observations stamped with a non-`auto` work mode are consumed without an outcome.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::error::HandlerError;
use crate::events::Event;
use crate::packs::{
    CodeSet, LineSettings, Observation, PackValidator, PendingObservation, SourceId,
    ValidatedPack,
};

/// Number of cameras feeding the correlator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrelationMode {
    /// One camera; no waiting, no pairing.
    Single,
    /// Two cameras looking at the same pack from different sides.
    Dual,
}

impl CorrelationMode {
    /// Mode for `workers` camera sources, `None` if unsupported.
    pub fn for_sources(workers: usize) -> Option<Self> {
        match workers {
            1 => Some(CorrelationMode::Single),
            2 => Some(CorrelationMode::Dual),
            _ => None,
        }
    }

    fn sources(self) -> usize {
        match self {
            CorrelationMode::Single => 1,
            CorrelationMode::Dual => 2,
        }
    }
}

/// Codes gathered from one camera for one correlation group.
#[derive(Default)]
struct Side {
    qr_codes: CodeSet,
    barcodes: CodeSet,
    members: usize,
    start_time: Option<SystemTime>,
    first_qr_seq: Option<u64>,
}

impl Side {
    fn absorb(&mut self, p: &PendingObservation, has_qr: bool) {
        self.qr_codes.extend_from(&p.observation.qr_codes);
        self.barcodes.extend_from(&p.observation.barcodes);
        self.members += 1;
        let start = p.observation.start_time;
        self.start_time = Some(self.start_time.map_or(start, |s| s.min(start)));
        if has_qr {
            self.first_qr_seq = Some(self.first_qr_seq.map_or(p.seq, |s| s.min(p.seq)));
        }
    }
}

/// Buffers observations per camera and emits validated pack outcomes.
pub struct PackResultCorrelator {
    mode: CorrelationMode,
    validator: PackValidator,
    result_timeout: Duration,
    max_skew: Duration,
    buffers: Vec<VecDeque<PendingObservation>>,
    next_seq: u64,
}

impl PackResultCorrelator {
    pub fn new(
        mode: CorrelationMode,
        validator: PackValidator,
        result_timeout: Duration,
        max_skew: Duration,
    ) -> Self {
        Self {
            mode,
            validator,
            result_timeout,
            max_skew,
            buffers: (0..mode.sources()).map(|_| VecDeque::new()).collect(),
            next_seq: 0,
        }
    }

    /// Buffers `observation`, stamped with the line settings in force now.
    pub fn enqueue(
        &mut self,
        observation: Observation,
        settings: &LineSettings,
    ) -> Result<(), HandlerError> {
        let source = observation.source;
        let buffer = self
            .buffers
            .get_mut(source.index())
            .ok_or(HandlerError::UnknownSource { id: source })?;

        buffer.push_back(PendingObservation {
            observation,
            expected_count: settings.expected_count,
            work_mode: settings.work_mode.clone(),
            paired: false,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        Ok(())
    }

    /// Observations buffered and not yet part of a decision.
    pub fn pending(&self) -> usize {
        self.buffers
            .iter()
            .flat_map(|b| b.iter())
            .filter(|p| !p.paired)
            .count()
    }

    /// Emits an outcome for every pack whose decision is due at `now`.
    pub fn drain_ready(&mut self, now: SystemTime) -> Vec<Event> {
        match self.mode {
            CorrelationMode::Single => self.drain_single(),
            CorrelationMode::Dual => self.drain_dual(now),
        }
    }

    fn drain_single(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        while let Some(p) = self.buffers[0].pop_front() {
            if !p.work_mode.is_auto() {
                info!(source = %p.observation.source, work_mode = %p.work_mode, "pack skipped: line not in auto mode");
                continue;
            }
            let pack = self.validator.validate(&p.observation, p.expected_count);
            debug!(accepted = pack.accepted, pairs = pack.codepairs.len(), "pack decided");
            out.push(pack.into_event());
        }
        out
    }

    fn drain_dual(&mut self, now: SystemTime) -> Vec<Event> {
        let mut out = Vec::new();
        loop {
            for buffer in &mut self.buffers {
                while buffer.front().is_some_and(|p| p.paired) {
                    buffer.pop_front();
                }
            }

            let Some(ci) = self.candidate() else { break };
            let candidate = &self.buffers[ci][0];
            let anchor = candidate.observation.finish_time;
            let ready = now
                .duration_since(anchor)
                .is_ok_and(|age| age > self.result_timeout);
            if !ready {
                break;
            }
            let expected = candidate.expected_count;
            let work_mode = candidate.work_mode.clone();

            let mut sides: [Side; 2] = Default::default();
            let mut mixed_expected = false;
            for (idx, buffer) in self.buffers.iter_mut().enumerate() {
                for p in buffer.iter_mut() {
                    if p.paired || abs_diff(p.observation.finish_time, anchor) > self.max_skew {
                        continue;
                    }
                    let has_qr = p
                        .observation
                        .qr_codes
                        .iter()
                        .any(|qr| !self.validator.policy().is_blacklisted(qr));
                    sides[idx].absorb(p, has_qr);
                    mixed_expected |= p.expected_count != expected;
                    p.paired = true;
                }
            }
            self.buffers[ci].pop_front();

            if mixed_expected {
                warn!(expected, "expected codes count changed within one pack; using the earliest");
            }
            let other = 1 - ci;
            if sides[other].members == 0 {
                warn!(
                    source = %SourceId(ci),
                    missing = %SourceId(other),
                    "no pair found; deciding on one camera"
                );
            }
            if !work_mode.is_auto() {
                info!(work_mode = %work_mode, "pack skipped: line not in auto mode");
                continue;
            }

            let pack = self.decide(sides, expected, anchor);
            debug!(accepted = pack.accepted, pairs = pack.codepairs.len(), "pack decided");
            out.push(pack.into_event());
        }
        out
    }

    fn decide(&self, sides: [Side; 2], expected: usize, anchor: SystemTime) -> ValidatedPack {
        let winner = match (sides[0].first_qr_seq, sides[1].first_qr_seq) {
            (None, None) => {
                info!("empty pack: no camera read a QR code");
                return self.validator.reject_empty(expected, anchor);
            }
            (Some(_), None) => 0,
            (None, Some(_)) => 1,
            (Some(a), Some(b)) => {
                let winner = if a <= b { 0 } else { 1 };
                warn!(
                    winner = %SourceId(winner),
                    qr_0 = sides[0].qr_codes.len(),
                    qr_1 = sides[1].qr_codes.len(),
                    "cameras desynced: both read QR codes for one pack"
                );
                winner
            }
        };

        let [side_0, side_1] = sides;
        let side = if winner == 0 { side_0 } else { side_1 };
        let merged = Observation {
            source: SourceId(winner),
            start_time: side.start_time.unwrap_or(anchor),
            finish_time: anchor,
            qr_codes: side.qr_codes,
            barcodes: side.barcodes,
        };
        self.validator.validate(&merged, expected)
    }

    /// Index of the buffer whose front finished first; ties go to the lower index.
    fn candidate(&self) -> Option<usize> {
        self.buffers
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.front().map(|p| (p.observation.finish_time, i)))
            .min()
            .map(|(_, i)| i)
    }
}

fn abs_diff(a: SystemTime, b: SystemTime) -> Duration {
    a.duration_since(b).unwrap_or_else(|e| e.duration())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packs::{CodePair, WorkMode};
    use crate::policies::ValidationPolicy;

    const TIMEOUT: Duration = Duration::from_secs(20);
    const SKEW: Duration = Duration::from_secs(4);

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs)
    }

    fn settings(expected: usize) -> LineSettings {
        LineSettings {
            expected_count: expected,
            work_mode: WorkMode::Auto,
        }
    }

    fn obs(source: usize, finish: u64, qr: &[&str], bar: &[&str]) -> Observation {
        Observation::new(
            SourceId(source),
            t(finish) - Duration::from_secs(1),
            t(finish),
            qr.iter().copied(),
            bar.iter().copied(),
        )
    }

    fn correlator(mode: CorrelationMode) -> PackResultCorrelator {
        PackResultCorrelator::new(
            mode,
            PackValidator::new(ValidationPolicy::default()),
            TIMEOUT,
            SKEW,
        )
    }

    fn good(pairs: &[(&str, &str)]) -> Event {
        Event::OutcomeGood {
            codepairs: pairs.iter().map(|(q, b)| CodePair::new(*q, *b)).collect(),
        }
    }

    #[test]
    fn single_camera_decides_on_next_drain() {
        let mut c = correlator(CorrelationMode::Single);
        c.enqueue(obs(0, 0, &["A", "B"], &["1", "2"]), &settings(2)).unwrap();

        let out = c.drain_ready(t(0));
        assert_eq!(out, vec![good(&[("A", "1"), ("B", "2")])]);
        assert!(c.drain_ready(t(100)).is_empty());
    }

    #[test]
    fn dual_camera_takes_the_side_that_read_codes() {
        let mut c = correlator(CorrelationMode::Dual);
        c.enqueue(obs(0, 0, &["A", "B"], &["1", "2"]), &settings(2)).unwrap();
        c.enqueue(obs(1, 1, &[], &[]), &settings(2)).unwrap();

        assert!(c.drain_ready(t(10)).is_empty(), "not ready before timeout");
        let out = c.drain_ready(t(21));
        assert_eq!(out, vec![good(&[("A", "1"), ("B", "2")])]);
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn desync_resolves_to_earliest_buffered_side() {
        let mut c = correlator(CorrelationMode::Dual);
        c.enqueue(obs(1, 2, &["X", "Y"], &["7", "8"]), &settings(2)).unwrap();
        c.enqueue(obs(0, 0, &["A", "B"], &["1", "2"]), &settings(2)).unwrap();

        let out = c.drain_ready(t(30));
        assert_eq!(out, vec![good(&[("X", "7"), ("Y", "8")])]);
    }

    #[test]
    fn neither_side_with_codes_is_an_empty_bad_pack() {
        let mut c = correlator(CorrelationMode::Dual);
        c.enqueue(obs(0, 0, &[], &["1"]), &settings(2)).unwrap();
        c.enqueue(obs(1, 0, &["https://xps.tn.ru/1"], &[]), &settings(2)).unwrap();

        let out = c.drain_ready(t(30));
        assert_eq!(out.len(), 1);
        match &out[0] {
            Event::OutcomeBad { codepairs } => assert_eq!(codepairs.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn readiness_is_strictly_after_timeout() {
        let mut c = correlator(CorrelationMode::Dual);
        c.enqueue(obs(0, 0, &["A", "B"], &["1", "2"]), &settings(2)).unwrap();

        assert!(c.drain_ready(t(20)).is_empty());
        assert_eq!(c.drain_ready(t(20) + Duration::from_millis(1)).len(), 1);
    }

    #[test]
    fn skew_boundary_is_inclusive() {
        let mut c = correlator(CorrelationMode::Dual);
        c.enqueue(obs(0, 0, &["A"], &["1"]), &settings(1)).unwrap();
        c.enqueue(obs(1, 4, &[], &[]), &settings(1)).unwrap();
        c.enqueue(obs(1, 9, &["Z"], &["9"]), &settings(1)).unwrap();

        let out = c.drain_ready(t(25));
        assert_eq!(out, vec![good(&[("A", "1")])]);
        // camera-1 at +4s was consumed by the first pack, +9s is still waiting
        assert_eq!(c.pending(), 1);
        assert_eq!(c.drain_ready(t(30)), vec![good(&[("Z", "9")])]);
    }

    #[test]
    fn draining_twice_emits_nothing_new() {
        let mut c = correlator(CorrelationMode::Dual);
        c.enqueue(obs(0, 0, &["A"], &["1"]), &settings(1)).unwrap();
        c.enqueue(obs(1, 1, &["A"], &["1"]), &settings(1)).unwrap();

        assert_eq!(c.drain_ready(t(40)).len(), 1);
        assert!(c.drain_ready(t(40)).is_empty());
        assert!(c.drain_ready(t(400)).is_empty());
    }

    #[test]
    fn group_merges_split_reads_of_one_side() {
        let mut c = correlator(CorrelationMode::Dual);
        c.enqueue(obs(0, 0, &["A"], &["1"]), &settings(2)).unwrap();
        c.enqueue(obs(0, 2, &["B", "A"], &["2"]), &settings(2)).unwrap();

        assert_eq!(c.drain_ready(t(30)), vec![good(&[("A", "1"), ("B", "2")])]);
    }

    #[test]
    fn manual_mode_consumes_without_outcome() {
        let manual = LineSettings {
            expected_count: 2,
            work_mode: WorkMode::Manual,
        };
        let mut c = correlator(CorrelationMode::Dual);
        c.enqueue(obs(0, 0, &["A", "B"], &["1", "2"]), &manual).unwrap();

        assert!(c.drain_ready(t(30)).is_empty());
        assert_eq!(c.pending(), 0);

        let mut single = correlator(CorrelationMode::Single);
        single.enqueue(obs(0, 0, &["A"], &["1"]), &manual).unwrap();
        assert!(single.drain_ready(t(0)).is_empty());
    }

    #[test]
    fn expected_count_is_taken_at_enqueue_time() {
        let mut c = correlator(CorrelationMode::Single);
        c.enqueue(obs(0, 0, &["A"], &["1"]), &settings(1)).unwrap();
        c.enqueue(obs(0, 1, &["B"], &["2"]), &settings(2)).unwrap();

        let out = c.drain_ready(t(1));
        assert!(matches!(out[0], Event::OutcomeGood { .. }));
        assert!(matches!(out[1], Event::OutcomeBad { .. }));
    }

    #[test]
    fn unknown_source_is_refused() {
        let mut c = correlator(CorrelationMode::Single);
        let err = c.enqueue(obs(1, 0, &["A"], &["1"]), &settings(1)).unwrap_err();
        assert_eq!(err, HandlerError::UnknownSource { id: SourceId(1) });
    }

    #[test]
    fn every_outcome_respects_the_length_invariant() {
        let mut c = correlator(CorrelationMode::Dual);
        let reads: [&[&str]; 4] = [&[], &["A"], &["A", "B"], &["A", "B", "C"]];
        for (i, qr) in reads.iter().enumerate() {
            c.enqueue(obs(i % 2, (i as u64) * 10, qr, &["1", "2"]), &settings(2))
                .unwrap();
        }
        for ev in c.drain_ready(t(500)) {
            if let Event::OutcomeGood { codepairs } = ev {
                assert_eq!(codepairs.len(), 2);
            }
        }
    }
}
