//! # Pack validation.
//!
//! [`PackValidator::validate`] turns the codes read for one pack into a
//! [`ValidatedPack`]. It is a pure function of its inputs: no clock, no logging.
//!
//! ## Steps
//! ```text
//! qr_codes ──► drop blacklisted ──► n = len
//! barcodes ──► keep first n ──► pad to n with the last barcode (or EMPTY_BARCODE)
//!
//! n == expected                      → accepted, zip(qr, barcodes)
//! n >  expected && !reject_if_more   → accepted, first `expected` pairs
//! n <  expected && !reject_if_less   → accepted, padded with placeholder pairs
//! otherwise                          → rejected
//!     replace_if_reject → `expected` placeholder pairs
//!     else              → the pairs as read
//! ```
//! A placeholder pair is `(empty_<unix seconds of finish_time>, EMPTY_BARCODE)`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::packs::{CodePair, Observation, ValidatedPack};
use crate::policies::ValidationPolicy;

/// Barcode reported when none was read.
pub const EMPTY_BARCODE: &str = "0000000000000";

/// Stateless validator holding its policy.
#[derive(Clone, Debug, Default)]
pub struct PackValidator {
    policy: ValidationPolicy,
}

impl PackValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Decides one pack from the codes in `obs` against `expected` pairs.
    pub fn validate(&self, obs: &Observation, expected: usize) -> ValidatedPack {
        let qr: Vec<&str> = obs
            .qr_codes
            .iter()
            .filter(|code| !self.policy.is_blacklisted(code))
            .collect();
        let barcodes = fit_barcodes(obs.barcodes.iter(), qr.len());

        let mut codepairs: Vec<CodePair> = qr
            .iter()
            .zip(barcodes.iter())
            .map(|(q, b)| CodePair::new(*q, *b))
            .collect();

        let n = codepairs.len();
        let accepted = if n == expected {
            true
        } else if n > expected {
            if self.policy.reject_if_more {
                false
            } else {
                codepairs.truncate(expected);
                true
            }
        } else if self.policy.reject_if_less {
            false
        } else {
            codepairs.extend(placeholders(expected - n, obs.finish_time));
            true
        };

        if !accepted && self.policy.replace_if_reject {
            codepairs = placeholders(expected, obs.finish_time).collect();
        }
        ValidatedPack {
            codepairs,
            accepted,
        }
    }

    /// Rejected pack for a pack on which no camera read anything.
    pub fn reject_empty(&self, expected: usize, at: SystemTime) -> ValidatedPack {
        let codepairs = if self.policy.replace_if_reject {
            placeholders(expected, at).collect()
        } else {
            Vec::new()
        };
        ValidatedPack {
            codepairs,
            accepted: false,
        }
    }
}

/// First `n` barcodes; short lists repeat the last one read.
fn fit_barcodes<'a>(read: impl Iterator<Item = &'a str>, n: usize) -> Vec<&'a str> {
    let mut out: Vec<&str> = read.take(n).collect();
    let filler = out.last().copied().unwrap_or(EMPTY_BARCODE);
    out.resize(n, filler);
    out
}

fn placeholders(count: usize, at: SystemTime) -> impl Iterator<Item = CodePair> {
    let secs = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let qr = format!("empty_{secs}");
    std::iter::repeat_n(CodePair::new(qr, EMPTY_BARCODE), count)
}
