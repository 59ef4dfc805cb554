//! # In-Place Bag Creation
//!
//! Turns an ordinary directory into a bag. Before 2.0 the directory's
//! entries are moved into `data/`; from 2.0 they stay where they are and the
//! control files go into `.bagit/`. Every payload file is read once and
//! hashed with all requested algorithms, then the writer runs in place so
//! the tag manifests cover the final tag files.
//!
//! Hidden entries are left out of the payload unless asked for. Before 2.0
//! top-level hidden entries stay at the root instead of moving into `data/`.
//! Hidden files that would still end up inside the payload area (nested
//! below a payload directory, or at a 2.0 root) make creation fail before
//! anything on disk changes, since they would be counted by Payload-Oxum
//! and reported as unlisted by full verification.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use bagit_core::{
    bagit_dir_for, is_hidden_name, Bag, BagError, BagResult, Manifest, ManifestKind, Version,
    BAGGING_DATE, BAGIT_FILE_NAME, PAYLOAD_DIR_NAME,
};
use bagit_crypto::{hash_file_multi, DigestFactory};
use bagit_verify::{walk_files, walk_payload};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::writer::BagWriter;

/// How to create a bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// BagIt version of the new bag; decides the `data/` or `.bagit/` layout.
    pub version: Version,
    /// Manifest algorithm names, e.g. `md5` or `sha512`.
    pub algorithms: Vec<String>,
    /// Hash hidden files into the payload manifests. When unset, hidden
    /// files inside the payload area are refused.
    pub include_hidden: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            version: Version::LATEST,
            algorithms: vec!["sha512".to_string()],
            include_hidden: false,
        }
    }
}

/// Create a bag from the contents of `root` and write it in place.
pub fn create_bag_in_place(
    root: &Path,
    options: &CreateOptions,
    writer: &BagWriter,
) -> BagResult<Bag> {
    if options.algorithms.is_empty() {
        return Err(BagError::InvalidFormat {
            value: String::new(),
            reason: "at least one manifest algorithm is required".into(),
        });
    }
    let mut algorithms: Vec<(&str, DigestFactory)> = Vec::new();
    for name in &options.algorithms {
        algorithms.push((name.as_str(), writer.registry().lookup(name)?));
    }
    if !options.include_hidden {
        let paths = hidden_payload_files(root, options.version)?;
        if !paths.is_empty() {
            return Err(BagError::HiddenPayloadFiles { paths });
        }
    }
    tracing::info!(
        root = %root.display(),
        version = %options.version,
        algorithms = ?options.algorithms,
        "creating bag in place"
    );

    if options.version.uses_dot_bagit() {
        let control = bagit_dir_for(options.version, root);
        std::fs::create_dir_all(&control).map_err(|e| BagError::io(&control, e))?;
    } else {
        move_into_payload_dir(root, options.include_hidden)?;
    }

    let mut bag = Bag::new(options.version);
    bag.root_dir = Some(root.to_path_buf());
    for manifest in hash_payload(root, options, &algorithms, writer)? {
        bag.set_payload_manifest(manifest);
    }
    bag.metadata.add(
        BAGGING_DATE,
        chrono::Local::now().format("%Y-%m-%d").to_string(),
    );

    let control = options.version.control_prefix();
    for (name, _) in &algorithms {
        let mut tags = Manifest::new(*name);
        tags.insert(format!("{control}{BAGIT_FILE_NAME}"), "");
        tags.insert(
            format!("{control}{}", options.version.metadata_file_name()),
            "",
        );
        for payload in &bag.payload_manifests {
            tags.insert(format!("{control}{}", payload.file_name(ManifestKind::Payload)), "");
        }
        bag.set_tag_manifest(tags);
    }

    writer.write(&mut bag, root)?;
    Ok(bag)
}

/// Hidden files under `root` that would become part of the payload.
///
/// Before 2.0 a hidden top-level entry stays at the root and is not payload.
fn hidden_payload_files(root: &Path, version: Version) -> BagResult<Vec<String>> {
    let dot_bagit = version.uses_dot_bagit();
    let files = if dot_bagit {
        walk_payload(root, version, false)?
    } else {
        walk_files(root, false)?
    };
    let hidden = files
        .into_iter()
        .map(|file| file.relative)
        .filter(|relative| {
            let mut parts = relative.split('/');
            match parts.next() {
                Some(first) if is_hidden_name(first) => dot_bagit,
                _ => parts.any(is_hidden_name),
            }
        })
        .collect();
    Ok(hidden)
}

/// Move every top-level entry of `root` into `data/` by way of a staging
/// directory, so an existing entry named `data` ends up as `data/data`.
fn move_into_payload_dir(root: &Path, include_hidden: bool) -> BagResult<()> {
    let staging = root.join(format!(".bagit-staging-{}", std::process::id()));
    let entries = std::fs::read_dir(root).map_err(|e| BagError::io(root, e))?;
    let mut to_move: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BagError::io(root, e))?;
        let name = entry.file_name();
        if !include_hidden && is_hidden_name(&name.to_string_lossy()) {
            continue;
        }
        to_move.push(entry.path());
    }

    std::fs::create_dir(&staging).map_err(|e| BagError::io(&staging, e))?;
    for from in &to_move {
        let Some(name) = from.file_name() else {
            continue;
        };
        let to = staging.join(name);
        std::fs::rename(from, &to).map_err(|e| BagError::io(from, e))?;
    }
    let data = root.join(PAYLOAD_DIR_NAME);
    std::fs::rename(&staging, &data).map_err(|e| BagError::io(&staging, e))?;
    tracing::debug!(entries = to_move.len(), "moved entries into payload directory");
    Ok(())
}

fn hash_payload(
    root: &Path,
    options: &CreateOptions,
    algorithms: &[(&str, DigestFactory)],
    writer: &BagWriter,
) -> BagResult<Vec<Manifest>> {
    let files = walk_payload(root, options.version, !options.include_hidden)?;
    tracing::debug!(files = files.len(), "hashing payload");

    let results: DashMap<String, BTreeMap<String, String>> = DashMap::new();
    let errors: Mutex<Vec<BagError>> = Mutex::new(Vec::new());
    let cancel = AtomicBool::new(false);
    writer.pool().run(files, &cancel, |file| {
        match hash_file_multi(&file.path, algorithms) {
            Ok(checksums) => {
                results.insert(file.relative, checksums);
            }
            Err(e) => errors.lock().push(e.into()),
        }
    });
    if let Some(err) = errors.into_inner().into_iter().next() {
        return Err(err);
    }

    let mut manifests: Vec<Manifest> = algorithms
        .iter()
        .map(|(name, _)| Manifest::new(*name))
        .collect();
    for (relative, checksums) in results {
        for manifest in &mut manifests {
            if let Some(checksum) = checksums.get(&manifest.algorithm) {
                manifest.insert(relative.clone(), checksum);
            }
        }
    }
    Ok(manifests)
}
