//! # Bag Metadata
//!
//! The contents of `bag-info.txt` (`package-info.txt` before 0.95): an
//! ordered list of `label: value` pairs. Labels may repeat and compare
//! case-insensitively, but keep the case they were written with.
//!
//! `Payload-Oxum` is special: there is at most one, and writing it replaces
//! the previous value rather than appending.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BagError;

/// Label of the payload summary entry.
pub const PAYLOAD_OXUM: &str = "Payload-Oxum";

/// Label of the bagging date entry.
pub const BAGGING_DATE: &str = "Bagging-Date";

/// `<octets>.<files>` summary of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PayloadOxum {
    /// Sum of payload file sizes in bytes.
    pub octets: u64,
    /// Number of payload files.
    pub files: u64,
}

impl PayloadOxum {
    /// Create a summary from its parts.
    pub fn new(octets: u64, files: u64) -> Self {
        Self { octets, files }
    }
}

impl std::fmt::Display for PayloadOxum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.octets, self.files)
    }
}

impl FromStr for PayloadOxum {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BagError::PayloadOxumAbsent {
            value: Some(s.to_string()),
        };
        let (octets, files) = s.trim().split_once('.').ok_or_else(malformed)?;
        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(octets) || !digits(files) {
            return Err(malformed());
        }
        Ok(Self {
            octets: octets.parse().map_err(|_| malformed())?,
            files: files.parse().map_err(|_| malformed())?,
        })
    }
}

/// Ordered, case-insensitive multi-map of bag metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair. `Payload-Oxum` replaces any existing value instead.
    pub fn add(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        if label.eq_ignore_ascii_case(PAYLOAD_OXUM) {
            self.upsert(label, value);
        } else {
            self.entries.push((label, value));
        }
    }

    /// Replace the Payload-Oxum entry, keeping its position if present.
    pub fn upsert_payload_oxum(&mut self, oxum: PayloadOxum) {
        self.upsert(PAYLOAD_OXUM.to_string(), oxum.to_string());
    }

    fn upsert(&mut self, label: String, value: String) {
        let mut seen = false;
        self.entries.retain_mut(|(l, v)| {
            if !l.eq_ignore_ascii_case(&label) {
                return true;
            }
            if seen {
                return false;
            }
            seen = true;
            *v = value.clone();
            true
        });
        if !seen {
            self.entries.push((label, value));
        }
    }

    /// The raw Payload-Oxum value, if present.
    pub fn payload_oxum(&self) -> Option<&str> {
        self.first(PAYLOAD_OXUM)
    }

    /// All values recorded under a label, in order.
    pub fn get(&self, label: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(l, _)| l.eq_ignore_ascii_case(label))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First value recorded under a label.
    pub fn first(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l.eq_ignore_ascii_case(label))
            .map(|(_, v)| v.as_str())
    }

    /// Remove every value under a label, returning the removed values.
    pub fn remove(&mut self, label: &str) -> Vec<String> {
        let mut removed = Vec::new();
        self.entries.retain(|(l, v)| {
            if l.eq_ignore_ascii_case(label) {
                removed.push(v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// True when any value is recorded under a label.
    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|(l, _)| l.eq_ignore_ascii_case(label))
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
