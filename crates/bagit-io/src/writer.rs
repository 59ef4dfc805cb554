//! # Writer Integrity Cycle
//!
//! Writes a bag to a destination so that its tag manifests describe the
//! tag files as they end up on disk. Tag manifests can only be correct
//! after every other tag file is final, so they are written twice: once
//! with the checksums the bag arrived with, then again after every entry
//! has been re-hashed at the destination.
//!
//! ## Phases
//!
//! 1. Copy payload into the version's layout. Fetch destinations are
//!    copied when the source already has them.
//! 2. Recompute Payload-Oxum from the written payload.
//! 3. `bagit.txt`.
//! 4. Payload manifests, unchanged.
//! 5. Bag metadata, if any.
//! 6. `fetch.txt`, if anything remains to fetch.
//! 7. Make sure every tag file a tag manifest lists exists at the
//!    destination, then write the tag manifests.
//! 8. Re-hash every tag manifest entry at the destination.
//! 9. Overwrite the tag manifests with the new checksums.
//!
//! Phases run strictly in order. A failure leaves whatever was already
//! written in place.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use bagit_core::{
    bagit_dir_for, payload_dir_for, validate_against_root, Bag, BagError, BagResult, Manifest,
    ManifestKind, PathPolicy, SafePath,
};
use bagit_crypto::{hash_file, AlgorithmRegistry, DigestFactory};
use bagit_verify::{calculate_payload_oxum, walk_payload, VerifierConfig, WorkerPool};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::text::{write_bagit_file, write_fetch, write_manifest, write_metadata};

/// Writes bags to disk.
#[derive(Debug, Clone)]
pub struct BagWriter {
    registry: AlgorithmRegistry,
    pool: WorkerPool,
    policy: PathPolicy,
}

impl Default for BagWriter {
    fn default() -> Self {
        Self::from_config(&VerifierConfig::default())
    }
}

struct RehashUnit<'a> {
    algorithm: &'a str,
    raw: &'a str,
    on_disk: PathBuf,
    factory: DigestFactory,
}

impl BagWriter {
    /// A writer with an explicit registry, pool and path policy.
    pub fn new(registry: AlgorithmRegistry, pool: WorkerPool, policy: PathPolicy) -> Self {
        Self {
            registry,
            pool,
            policy,
        }
    }

    /// A writer with the standard registry, sized by `config`.
    pub fn from_config(config: &VerifierConfig) -> Self {
        Self::new(
            AlgorithmRegistry::standard(),
            config.pool(),
            config.path_policy(),
        )
    }

    /// Registry used to resolve manifest algorithms.
    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    /// Pool used for hashing.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Write `bag` to `dest` and bind it there.
    pub fn write(&self, bag: &mut Bag, dest: &Path) -> BagResult<()> {
        tracing::info!(dest = %dest.display(), version = %bag.version, "writing bag");
        let source = bag.root_dir.clone();
        let in_place = match &source {
            Some(src) => same_dir(src, dest),
            None => false,
        };

        // Phase 1
        let control = self.write_payload(bag, source.as_deref(), dest, in_place)?;

        // Phase 2
        let oxum = calculate_payload_oxum(dest, bag.version, false)?;
        tracing::debug!(%oxum, "payload oxum");
        bag.metadata.upsert_payload_oxum(oxum);

        // Phases 3-6
        write_bagit_file(&control, bag.version, &bag.file_encoding)?;
        for manifest in &bag.payload_manifests {
            write_manifest(&control, manifest, ManifestKind::Payload)?;
        }
        if !bag.metadata.is_empty() {
            write_metadata(&control, bag.version, &bag.metadata)?;
        }
        if !bag.items_to_fetch.is_empty() {
            write_fetch(&control, &bag.items_to_fetch)?;
        }

        if !bag.tag_manifests.is_empty() {
            // Phase 7
            self.ensure_tag_files(bag, source.as_deref(), dest, in_place)?;
            for manifest in &bag.tag_manifests {
                write_manifest(&control, manifest, ManifestKind::Tag)?;
            }

            // Phase 8
            let updated = self.rehash_tag_manifests(bag, dest)?;
            bag.tag_manifests = updated;

            // Phase 9
            for manifest in &bag.tag_manifests {
                write_manifest(&control, manifest, ManifestKind::Tag)?;
            }
        }

        bag.root_dir = Some(dest.to_path_buf());
        tracing::info!(dest = %dest.display(), "bag written");
        Ok(())
    }

    /// Copy payload into place and return the control directory.
    fn write_payload(
        &self,
        bag: &Bag,
        source: Option<&Path>,
        dest: &Path,
        in_place: bool,
    ) -> BagResult<PathBuf> {
        for item in &bag.items_to_fetch {
            validate_against_root(&item.path, dest, &self.policy)?;
        }
        let payload_dir = payload_dir_for(bag.version, dest);
        let control = bagit_dir_for(bag.version, dest);
        create_dir_all(&payload_dir)?;
        create_dir_all(&control)?;

        let Some(source) = source else {
            return Ok(control);
        };
        if in_place {
            tracing::debug!("writing in place; payload copy skipped");
            return Ok(control);
        }

        let mut copied = 0usize;
        for file in walk_payload(source, bag.version, false)? {
            copy_file(&file.path, &join_relative(dest, &file.relative))?;
            copied += 1;
        }
        tracing::info!(files = copied, "payload copied");
        Ok(control)
    }

    fn ensure_tag_files(
        &self,
        bag: &Bag,
        source: Option<&Path>,
        dest: &Path,
        in_place: bool,
    ) -> BagResult<()> {
        let mut seen = BTreeSet::new();
        for manifest in &bag.tag_manifests {
            for raw in manifest.entries.keys() {
                let safe = validate_against_root(raw, dest, &self.policy)?;
                if !seen.insert(safe.clone()) {
                    continue;
                }
                let target = safe.to_path(dest);
                if target.exists() || in_place {
                    continue;
                }
                if let Some(source) = source {
                    let origin = safe.to_path(source);
                    if origin.is_file() {
                        copy_file(&origin, &target)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn rehash_tag_manifests(&self, bag: &Bag, dest: &Path) -> BagResult<Vec<Manifest>> {
        let mut units = Vec::new();
        for manifest in &bag.tag_manifests {
            let factory = self.registry.lookup(&manifest.algorithm)?;
            for raw in manifest.entries.keys() {
                let safe: SafePath = validate_against_root(raw, dest, &self.policy)?;
                units.push(RehashUnit {
                    algorithm: &manifest.algorithm,
                    raw,
                    on_disk: safe.to_path(dest),
                    factory,
                });
            }
        }
        tracing::debug!(entries = units.len(), "re-hashing tag files");

        let checksums: DashMap<(String, String), String> = DashMap::new();
        let errors: Mutex<Vec<BagError>> = Mutex::new(Vec::new());
        let cancel = AtomicBool::new(false);
        self.pool.run(units, &cancel, |unit| {
            match hash_file(&unit.on_disk, unit.factory) {
                Ok(checksum) => {
                    checksums.insert((unit.algorithm.to_string(), unit.raw.to_string()), checksum);
                }
                Err(e) => errors.lock().push(e.into()),
            }
        });
        if let Some(err) = errors.into_inner().into_iter().next() {
            return Err(err);
        }

        let mut updated = Vec::with_capacity(bag.tag_manifests.len());
        for manifest in &bag.tag_manifests {
            let mut fresh = Manifest::new(manifest.algorithm.clone());
            for raw in manifest.entries.keys() {
                let key = (manifest.algorithm.clone(), raw.clone());
                if let Some((_, checksum)) = checksums.remove(&key) {
                    fresh.insert(raw.clone(), &checksum);
                }
            }
            updated.push(fresh);
        }
        Ok(updated)
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn join_relative(root: &Path, relative: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in relative.split('/') {
        out.push(part);
    }
    out
}

fn create_dir_all(dir: &Path) -> BagResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| BagError::io(dir, e))
}

fn copy_file(from: &Path, to: &Path) -> BagResult<()> {
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }
    std::fs::copy(from, to).map_err(|e| BagError::io(from, e))?;
    Ok(())
}
