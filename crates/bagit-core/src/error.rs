//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy shared by every crate in the workspace. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Design
//!
//! - Security failures (`MaliciousPath`) are distinct from format failures
//!   (`InvalidFormat`) so callers can tell "actively malicious" from
//!   "malformed".
//! - Each missing-structure condition is its own variant so an incomplete
//!   bag can be special-cased without string matching.
//! - Integrity failures always name the file, the algorithm, and the
//!   expected vs actual values.

use std::path::PathBuf;

use thiserror::Error;

/// Which half of a Payload-Oxum disagreed with the payload on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OxumField {
    /// Total payload octets.
    Octets,
    /// Number of payload files.
    Files,
}

impl std::fmt::Display for OxumField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Octets => f.write_str("total size"),
            Self::Files => f.write_str("file count"),
        }
    }
}

/// Top-level error type for bag reading, verification, and writing.
#[derive(Error, Debug)]
pub enum BagError {
    /// A manifest or fetch entry resolves outside the permitted root.
    #[error("malicious path {path:?}: {reason}")]
    MaliciousPath {
        /// The raw value as recorded.
        path: String,
        /// Which rule rejected it.
        reason: String,
    },

    /// A malformed entry: bad separator, reserved name, unparsable value.
    #[error("invalid format {value:?}: {reason}")]
    InvalidFormat {
        /// The offending raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The bagit declaration file is absent.
    #[error("bagit declaration file {path} should exist but it doesn't")]
    MissingBagitFile {
        /// Expected location of `bagit.txt`.
        path: PathBuf,
    },

    /// Payload manifests list files but the payload directory is absent.
    #[error("payload directory {path} should exist but it doesn't")]
    MissingPayloadDirectory {
        /// Expected payload directory.
        path: PathBuf,
    },

    /// No `manifest-<algorithm>.txt` file was found.
    #[error("bag at {path} does not contain any payload manifest files")]
    MissingPayloadManifest {
        /// Directory that was searched.
        path: PathBuf,
    },

    /// A fetch item's destination lies outside the payload area.
    #[error("fetch item {url} targets {path:?}, which is outside the payload directory")]
    FetchItemOutsidePayload {
        /// Remote location of the item.
        url: String,
        /// Destination as recorded in the fetch list.
        path: String,
    },

    /// A computed checksum disagrees with the recorded one.
    #[error(
        "{algorithm} checksum mismatch for {path}: expected {expected}, computed {actual}{}",
        further_mismatches(.additional)
    )]
    CorruptChecksum {
        /// Root-relative path of the file.
        path: String,
        /// Algorithm of the manifest that recorded the checksum.
        algorithm: String,
        /// Recorded checksum.
        expected: String,
        /// Checksum of the bytes on disk.
        actual: String,
        /// Number of other mismatches found in the same run.
        additional: usize,
    },

    /// Manifests list files that are not on disk.
    #[error("manifest(s) list file(s) {paths:?} but they don't exist")]
    FileNotInPayloadDirectory {
        /// Root-relative paths of the missing files.
        paths: Vec<String>,
    },

    /// A file is present but not declared by a manifest of its kind.
    #[error("file {path} is not listed in {}", manifest_label(.manifest))]
    FileNotInManifest {
        /// Root-relative path of the file.
        path: String,
        /// Algorithm of the manifest missing the entry; `None` means all.
        manifest: Option<String>,
    },

    /// A manifest declares an algorithm absent from the registry.
    #[error("unsupported checksum algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// Algorithm identifier as declared.
        algorithm: String,
    },

    /// Payload-Oxum is missing or not of the form `<octets>.<files>`.
    #[error("Payload-Oxum does not exist in bag or is malformed{}", malformed_value(.value))]
    PayloadOxumAbsent {
        /// The malformed value, if one was present.
        value: Option<String>,
    },

    /// Payload-Oxum disagrees with the payload on disk.
    #[error("invalid Payload-Oxum {field}: expected {expected} but calculated {actual}")]
    PayloadOxumMismatch {
        /// Which number diverged.
        field: OxumField,
        /// Value recorded in the metadata.
        expected: u64,
        /// Value computed from disk.
        actual: u64,
    },

    /// The bag is still holey: fetch items have not been materialized.
    #[error("fetch item(s) have not been fetched: {paths:?}")]
    UnresolvedFetchItems {
        /// Destination paths not present on disk.
        paths: Vec<String>,
    },

    /// Bag creation would leave hidden files in the payload area without
    /// listing them in any manifest.
    #[error(
        "hidden file(s) {paths:?} would sit unlisted in the payload; remove them or include hidden files"
    )]
    HiddenPayloadFiles {
        /// Paths relative to the directory being bagged.
        paths: Vec<String>,
    },

    /// A cancelled run left work units unexecuted.
    #[error("verification cancelled with {skipped} unit(s) not run")]
    Cancelled {
        /// Units that never ran.
        skipped: usize,
    },

    /// The operation needs a bag bound to a directory.
    #[error("bag is not bound to a root directory: {0}")]
    UnboundBag(String),

    /// I/O failure on a known path.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or directory being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

impl BagError {
    /// Wrap an I/O error with the path that caused it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures that indicate an entry points outside the bag.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::MaliciousPath { .. })
    }

    /// True for the "bag is simply incomplete" family.
    pub fn is_missing_structure(&self) -> bool {
        matches!(
            self,
            Self::MissingBagitFile { .. }
                | Self::MissingPayloadDirectory { .. }
                | Self::MissingPayloadManifest { .. }
                | Self::FetchItemOutsidePayload { .. }
        )
    }
}

fn further_mismatches(additional: &usize) -> String {
    if *additional > 0 {
        format!(" ({additional} further mismatch(es))")
    } else {
        String::new()
    }
}

fn manifest_label(manifest: &Option<String>) -> String {
    match manifest {
        Some(algorithm) => format!("the {algorithm} manifest"),
        None => "any manifest".to_string(),
    }
}

fn malformed_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .map(|v| format!(": {v:?}"))
        .unwrap_or_default()
}

/// Result type alias for bag operations.
pub type BagResult<T> = Result<T, BagError>;
