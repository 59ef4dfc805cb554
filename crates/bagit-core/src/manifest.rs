//! # Manifest — the Checksum Ledger
//!
//! A manifest records one algorithm and a mapping from recorded path to
//! lower-case hex checksum. Keys are kept exactly as recorded (root-relative,
//! forward slashes, not yet validated); the path safety validator runs over
//! them before any verification work.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Whether a manifest covers payload files or tag files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManifestKind {
    /// `manifest-<algorithm>.txt`
    Payload,
    /// `tagmanifest-<algorithm>.txt`
    Tag,
}

impl ManifestKind {
    /// File name prefix for this kind of manifest.
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Self::Payload => "manifest-",
            Self::Tag => "tagmanifest-",
        }
    }
}

impl std::fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Payload => f.write_str("payload"),
            Self::Tag => f.write_str("tag"),
        }
    }
}

/// One algorithm plus its `path -> checksum` mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Algorithm identifier as used in the manifest file name (e.g. `sha256`).
    pub algorithm: String,
    /// Recorded path to lower-case hex checksum.
    pub entries: BTreeMap<String, String>,
}

impl Manifest {
    /// Create an empty manifest for an algorithm.
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Record a checksum for a path. The checksum is stored lower-case.
    pub fn insert(&mut self, path: impl Into<String>, checksum: &str) {
        self.entries
            .insert(path.into(), checksum.trim().to_ascii_lowercase());
    }

    /// Checksum recorded for a path, if any.
    pub fn checksum(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the manifest lists no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// File name of this manifest on disk.
    pub fn file_name(&self, kind: ManifestKind) -> String {
        format!("{}{}.txt", kind.file_prefix(), self.algorithm)
    }

    /// Extract the algorithm from a manifest file name, e.g.
    /// `tagmanifest-sha256.txt` gives `(Tag, "sha256")`.
    pub fn parse_file_name(file_name: &str) -> Option<(ManifestKind, String)> {
        let (kind, rest) = if let Some(rest) = file_name.strip_prefix("tagmanifest-") {
            (ManifestKind::Tag, rest)
        } else if let Some(rest) = file_name.strip_prefix("manifest-") {
            (ManifestKind::Payload, rest)
        } else {
            return None;
        };
        let algorithm = rest.strip_suffix(".txt")?;
        if algorithm.is_empty() {
            return None;
        }
        Some((kind, algorithm.to_string()))
    }
}
