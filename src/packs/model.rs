//! # Pack data model.
//!
//! Plain values exchanged between workers, the correlator and the outcome sinks:
//! - [`SourceId`] identifies a camera worker;
//! - [`CodeSet`] is an insertion-ordered set of decoded strings;
//! - [`Observation`] is one camera's report of a pack passing by;
//! - [`PendingObservation`] is an observation buffered by the correlator;
//! - [`CodePair`] / [`ValidatedPack`] are the validation result;
//! - [`LineSettings`] / [`WorkMode`] are the backend-provided line parameters.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::events::Event;

/// Identifier of a camera worker (its position in the worker list).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(pub usize);

impl SourceId {
    /// Index of the correlator buffer this source feeds.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "camera-{}", self.0)
    }
}

/// Insertion-ordered set of codes.
///
/// Inserting a code that is already present is a no-op, so the first read wins its position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CodeSet(Vec<String>);

impl CodeSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `code` unless already present. Returns `true` if it was added.
    pub fn insert(&mut self, code: impl Into<String>) -> bool {
        let code = code.into();
        if self.0.contains(&code) {
            return false;
        }
        self.0.push(code);
        true
    }

    /// Appends every code of `other` that is not yet present, keeping `other`'s order.
    pub fn extend_from(&mut self, other: &CodeSet) {
        for code in other.iter() {
            self.insert(code);
        }
    }

    /// Iterates codes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for CodeSet {
    fn from(codes: Vec<String>) -> Self {
        codes.into_iter().collect()
    }
}

impl From<CodeSet> for Vec<String> {
    fn from(set: CodeSet) -> Self {
        set.0
    }
}

impl<S: Into<String>> FromIterator<S> for CodeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = CodeSet::new();
        for code in iter {
            set.insert(code);
        }
        set
    }
}

/// One camera's report of the codes read while a pack was in view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Reporting camera.
    pub source: SourceId,
    /// When the pack entered the view.
    pub start_time: SystemTime,
    /// When the pack left the view; correlation is keyed on this instant.
    pub finish_time: SystemTime,
    /// Decoded QR codes.
    pub qr_codes: CodeSet,
    /// Decoded EAN-13 barcodes.
    pub barcodes: CodeSet,
}

impl Observation {
    /// Creates an observation; duplicate codes are collapsed.
    pub fn new<Q, B>(
        source: SourceId,
        start_time: SystemTime,
        finish_time: SystemTime,
        qr_codes: Q,
        barcodes: B,
    ) -> Self
    where
        Q: IntoIterator,
        Q::Item: Into<String>,
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            source,
            start_time,
            finish_time,
            qr_codes: qr_codes.into_iter().collect(),
            barcodes: barcodes.into_iter().collect(),
        }
    }
}

/// Line work mode reported by the backend.
///
/// Only [`WorkMode::Auto`] produces pack outcomes; in any other mode operators
/// handle packs and observations are consumed silently.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum WorkMode {
    #[default]
    Auto,
    Manual,
    /// Any mode string this crate does not know.
    Other(String),
}

impl WorkMode {
    #[inline]
    pub fn is_auto(&self) -> bool {
        matches!(self, WorkMode::Auto)
    }
}

impl From<&str> for WorkMode {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "auto" => WorkMode::Auto,
            "manual" => WorkMode::Manual,
            other => WorkMode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkMode::Auto => f.write_str("auto"),
            WorkMode::Manual => f.write_str("manual"),
            WorkMode::Other(raw) => f.write_str(raw),
        }
    }
}

/// Line parameters refreshed from the backend and stamped onto each observation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineSettings {
    /// Number of QR/barcode pairs every pack must carry.
    pub expected_count: usize,
    /// Current work mode.
    pub work_mode: WorkMode,
}

/// Observation buffered by the correlator, awaiting its counterpart.
#[derive(Clone, Debug)]
pub struct PendingObservation {
    pub observation: Observation,
    /// Expected count in force when the observation was enqueued.
    pub expected_count: usize,
    /// Work mode in force when the observation was enqueued.
    pub work_mode: WorkMode,
    /// Set once the observation joined a correlation group.
    pub paired: bool,
    /// Enqueue order across all buffers.
    pub seq: u64,
}

/// One QR code with the barcode printed next to it.
///
/// Serializes to the backend body `{"qr": .., "barcode": ..}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodePair {
    pub qr: String,
    pub barcode: String,
}

impl CodePair {
    pub fn new(qr: impl Into<String>, barcode: impl Into<String>) -> Self {
        Self {
            qr: qr.into(),
            barcode: barcode.into(),
        }
    }
}

/// Final decision for one physical pack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedPack {
    pub codepairs: Vec<CodePair>,
    pub accepted: bool,
}

impl ValidatedPack {
    /// Converts the decision into its outcome event.
    pub fn into_event(self) -> Event {
        if self.accepted {
            Event::OutcomeGood {
                codepairs: self.codepairs,
            }
        } else {
            Event::OutcomeBad {
                codepairs: self.codepairs,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_set_keeps_first_position() {
        let set: CodeSet = ["A", "B", "A", "C", "B"].into_iter().collect();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn code_set_deserializes_with_set_semantics() {
        let set: CodeSet = serde_json::from_str(r#"["x","y","x"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["x","y"]"#);
    }

    #[test]
    fn work_mode_parses_backend_strings() {
        assert_eq!(WorkMode::from("auto"), WorkMode::Auto);
        assert_eq!(WorkMode::from(" manual "), WorkMode::Manual);
        assert_eq!(
            WorkMode::from("calibration"),
            WorkMode::Other("calibration".into())
        );
        assert_eq!(WorkMode::Other("calibration".into()).to_string(), "calibration");
    }

    #[test]
    fn codepair_matches_backend_body() {
        let body = serde_json::to_value(CodePair::new("QR1", "4600000000001")).unwrap();
        assert_eq!(body, serde_json::json!({"qr": "QR1", "barcode": "4600000000001"}));
    }
}
