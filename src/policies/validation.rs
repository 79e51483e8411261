//! # Pack validation policy.
//!
//! [`ValidationPolicy`] tells the [`PackValidator`](crate::PackValidator) what to do
//! when the number of QR codes read differs from the expected count.
//!
//! - `reject_if_less`: fewer codes than expected rejects the pack (otherwise padded);
//! - `reject_if_more`: more codes than expected rejects the pack (otherwise truncated);
//! - `replace_if_reject`: a rejected pack reports placeholder pairs instead of what was read;
//! - `blacklist`: QR codes containing any of these substrings are ignored.
//!
//! The default is strict: both mismatches reject and rejected packs are replaced.

/// Substring of QR codes that are not product codes (printed on shipping labels).
pub const DEFAULT_BLACKLIST: &str = "xps.tn.ru";

/// Knobs of the pack validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Reject packs with fewer QR codes than expected.
    pub reject_if_less: bool,
    /// Reject packs with more QR codes than expected.
    pub reject_if_more: bool,
    /// Report placeholder pairs for rejected packs.
    pub replace_if_reject: bool,
    /// QR codes containing any of these substrings are dropped before counting.
    pub blacklist: Vec<String>,
}

impl ValidationPolicy {
    /// Whether `qr` contains a blacklisted sentinel.
    #[inline]
    pub fn is_blacklisted(&self, qr: &str) -> bool {
        self.blacklist
            .iter()
            .any(|needle| !needle.is_empty() && qr.contains(needle.as_str()))
    }
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            reject_if_less: true,
            reject_if_more: true,
            replace_if_reject: true,
            blacklist: vec![DEFAULT_BLACKLIST.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_matches_substrings() {
        let p = ValidationPolicy::default();
        assert!(p.is_blacklisted("https://xps.tn.ru/track/123"));
        assert!(!p.is_blacklisted("0104600000000001215abc"));
    }

    #[test]
    fn empty_sentinel_never_matches() {
        let p = ValidationPolicy {
            blacklist: vec![String::new()],
            ..ValidationPolicy::default()
        };
        assert!(!p.is_blacklisted("anything"));
    }
}
