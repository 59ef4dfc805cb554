//! # Bag — the Aggregate Root
//!
//! A [`Bag`] ties together the version, manifests, fetch list, and metadata
//! of one bag, optionally bound to a directory on disk. Verification only
//! reads it; the writer is its sole mutator while writing.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BagError, BagResult};
use crate::fetch::FetchItem;
use crate::manifest::Manifest;
use crate::metadata::Metadata;
use crate::version::{Version, DOT_BAGIT_DIR_NAME, PAYLOAD_DIR_NAME};

/// Character encoding written to and accepted from `bagit.txt`.
pub const DEFAULT_FILE_ENCODING: &str = "UTF-8";

/// An in-memory bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bag {
    /// BagIt version of the layout.
    pub version: Version,
    /// Tag file character encoding.
    pub file_encoding: String,
    /// Payload manifests, at most one per algorithm.
    pub payload_manifests: Vec<Manifest>,
    /// Tag manifests, at most one per algorithm.
    pub tag_manifests: Vec<Manifest>,
    /// Payload not yet present locally.
    pub items_to_fetch: Vec<FetchItem>,
    /// Contents of the bag-info file.
    pub metadata: Metadata,
    /// Directory the bag lives in, if any.
    pub root_dir: Option<PathBuf>,
}

impl Bag {
    /// An empty, unbound, UTF-8 bag.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            file_encoding: DEFAULT_FILE_ENCODING.to_string(),
            payload_manifests: Vec::new(),
            tag_manifests: Vec::new(),
            items_to_fetch: Vec::new(),
            metadata: Metadata::new(),
            root_dir: None,
        }
    }

    /// Add a payload manifest, replacing any with the same algorithm.
    pub fn set_payload_manifest(&mut self, manifest: Manifest) {
        upsert_manifest(&mut self.payload_manifests, manifest);
    }

    /// Add a tag manifest, replacing any with the same algorithm.
    pub fn set_tag_manifest(&mut self, manifest: Manifest) {
        upsert_manifest(&mut self.tag_manifests, manifest);
    }

    /// Payload manifest for an algorithm.
    pub fn payload_manifest(&self, algorithm: &str) -> Option<&Manifest> {
        self.payload_manifests
            .iter()
            .find(|m| m.algorithm == algorithm)
    }

    /// Tag manifest for an algorithm.
    pub fn tag_manifest(&self, algorithm: &str) -> Option<&Manifest> {
        self.tag_manifests.iter().find(|m| m.algorithm == algorithm)
    }

    /// Bound root directory, or `UnboundBag` naming the operation.
    pub fn root(&self, operation: &str) -> BagResult<&Path> {
        self.root_dir
            .as_deref()
            .ok_or_else(|| BagError::UnboundBag(operation.to_string()))
    }

    /// Payload directory of the bound bag.
    pub fn payload_dir(&self) -> BagResult<PathBuf> {
        Ok(payload_dir_for(self.version, self.root("payload_dir")?))
    }

    /// Control directory (bag root, or `.bagit/` for 2.0+) of the bound bag.
    pub fn bagit_dir(&self) -> BagResult<PathBuf> {
        Ok(bagit_dir_for(self.version, self.root("bagit_dir")?))
    }

    /// Name of the payload directory relative to the root (`""` for 2.0+).
    pub fn payload_dir_name(&self) -> &'static str {
        if self.version.uses_dot_bagit() {
            ""
        } else {
            PAYLOAD_DIR_NAME
        }
    }

    /// True when any payload manifest lists at least one file.
    pub fn has_payload_entries(&self) -> bool {
        self.payload_manifests.iter().any(|m| !m.is_empty())
    }
}

impl Default for Bag {
    fn default() -> Self {
        Self::new(Version::LATEST)
    }
}

fn upsert_manifest(manifests: &mut Vec<Manifest>, manifest: Manifest) {
    match manifests
        .iter_mut()
        .find(|m| m.algorithm == manifest.algorithm)
    {
        Some(existing) => *existing = manifest,
        None => manifests.push(manifest),
    }
}

/// Payload directory for a version and root.
pub fn payload_dir_for(version: Version, root: &Path) -> PathBuf {
    if version.uses_dot_bagit() {
        root.to_path_buf()
    } else {
        root.join(PAYLOAD_DIR_NAME)
    }
}

/// Control directory for a version and root.
pub fn bagit_dir_for(version: Version, root: &Path) -> PathBuf {
    if version.uses_dot_bagit() {
        root.join(DOT_BAGIT_DIR_NAME)
    } else {
        root.to_path_buf()
    }
}
