//! # Manifest Verifier
//!
//! Checks that every file a manifest declares exists, that every payload
//! file is declared, and (optionally) that every recorded checksum matches
//! the bytes on disk.
//!
//! ## Phases
//!
//! 1. **Plan.** Every manifest algorithm is resolved in the registry and
//!    every recorded path goes through the path safety validator. Any
//!    failure aborts the run before a single file is opened. Payload
//!    manifests must agree on their path set, as must tag manifests.
//! 2. **Existence.** One unit per declared file runs on the worker pool,
//!    while the calling thread walks the payload area looking for files no
//!    payload manifest declares.
//! 3. **Hashing.** One unit per `(found file, algorithm)` runs on the pool.
//! 4. **Aggregation.** After the pool joins, outcomes become a
//!    [`VerificationReport`].
//!
//! Tag files that no tag manifest lists are allowed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bagit_core::{
    validate_against_root, Bag, BagError, BagResult, Manifest, PathPolicy, SafePath,
};
use bagit_crypto::{hash_file, AlgorithmRegistry, DigestFactory};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::locate::locate;
use crate::pool::WorkerPool;
use crate::walk::walk_payload;

/// A recorded checksum that disagrees with the file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumMismatch {
    /// Normalized root-relative path.
    pub path: String,
    /// Algorithm of the manifest that recorded the value.
    pub algorithm: String,
    /// Recorded checksum.
    pub expected: String,
    /// Computed checksum.
    pub actual: String,
}

/// Everything one verification run observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Distinct files declared across all manifests.
    pub files_declared: usize,
    /// Checksums computed and compared.
    pub checksums_compared: usize,
    /// Declared files not found on disk, sorted.
    pub missing: Vec<String>,
    /// Payload files declared by no payload manifest, sorted.
    pub unlisted: Vec<String>,
    /// Checksum mismatches, sorted by path then algorithm.
    pub corrupt: Vec<ChecksumMismatch>,
    /// Units that never ran because the run was cancelled.
    pub skipped_units: usize,
}

impl VerificationReport {
    /// True when nothing failed and nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.unlisted.is_empty()
            && self.corrupt.is_empty()
            && self.skipped_units == 0
    }

    /// The single failure to report, by priority: missing files, then
    /// unlisted files, then checksum mismatches, then cancellation.
    pub fn first_failure(&self) -> Option<BagError> {
        if !self.missing.is_empty() {
            return Some(BagError::FileNotInPayloadDirectory {
                paths: self.missing.clone(),
            });
        }
        if let Some(path) = self.unlisted.first() {
            return Some(BagError::FileNotInManifest {
                path: path.clone(),
                manifest: None,
            });
        }
        if let Some(first) = self.corrupt.first() {
            return Some(BagError::CorruptChecksum {
                path: first.path.clone(),
                algorithm: first.algorithm.clone(),
                expected: first.expected.clone(),
                actual: first.actual.clone(),
                additional: self.corrupt.len() - 1,
            });
        }
        if self.skipped_units > 0 {
            return Some(BagError::Cancelled {
                skipped: self.skipped_units,
            });
        }
        None
    }

    /// `Ok` for a clean report, otherwise the highest-priority failure.
    pub fn into_result(self) -> BagResult<()> {
        match self.first_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// What to do in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InspectOptions {
    /// Skip dot-entries when looking for unlisted payload files.
    pub ignore_hidden: bool,
    /// Compute and compare checksums of found files.
    pub hash_contents: bool,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            ignore_hidden: false,
            hash_contents: true,
        }
    }
}

struct Expectation {
    algorithm: String,
    expected: String,
    factory: DigestFactory,
}

struct Plan {
    files: BTreeMap<SafePath, Vec<Expectation>>,
    payload_nfc: BTreeSet<String>,
}

#[derive(Default)]
struct Outcomes {
    found: DashMap<SafePath, PathBuf>,
    missing: DashSet<String>,
    corrupt: DashMap<(String, String), ChecksumMismatch>,
    errors: Mutex<Vec<BagError>>,
    compared: AtomicUsize,
}

/// Concurrent verifier over a bag's manifests.
#[derive(Debug, Clone)]
pub struct ManifestVerifier {
    registry: AlgorithmRegistry,
    pool: WorkerPool,
    policy: PathPolicy,
}

impl ManifestVerifier {
    /// Build a verifier.
    pub fn new(registry: AlgorithmRegistry, pool: WorkerPool, policy: PathPolicy) -> Self {
        Self {
            registry,
            pool,
            policy,
        }
    }

    /// Run every check and collect the outcomes.
    ///
    /// Returns `Err` only for failures that stop the run: an unsafe path,
    /// an unknown algorithm, manifests disagreeing on their path sets, or
    /// an I/O error while reading a file.
    pub fn inspect(
        &self,
        bag: &Bag,
        options: InspectOptions,
        cancel: &AtomicBool,
    ) -> BagResult<VerificationReport> {
        let root = bag.root("verify_manifests")?;
        let plan = self.plan(bag, root)?;
        tracing::info!(
            root = %root.display(),
            files = plan.files.len(),
            workers = self.pool.workers(),
            "verifying manifests"
        );

        let mut outcomes = Outcomes::default();
        let units: Vec<&SafePath> = plan.files.keys().collect();
        let (existence, walked) = self.pool.run_with(
            units,
            cancel,
            |safe| match locate(root, safe) {
                Some(on_disk) => {
                    outcomes.found.insert(safe.clone(), on_disk);
                }
                None => {
                    tracing::debug!(path = %safe, "declared file not found");
                    outcomes.missing.insert(safe.as_str().to_string());
                }
            },
            || walk_payload(root, bag.version, options.ignore_hidden),
        );
        let walked = walked?;

        let mut unlisted: Vec<String> = walked
            .into_iter()
            .filter(|file| {
                let nfc: String = file.relative.nfc().collect();
                !plan.payload_nfc.contains(&nfc)
            })
            .map(|file| file.relative)
            .collect();
        unlisted.sort();

        let mut skipped = existence.skipped;
        let found: BTreeMap<SafePath, PathBuf> =
            std::mem::take(&mut outcomes.found).into_iter().collect();
        if options.hash_contents {
            let mut hash_units = Vec::new();
            for (safe, on_disk) in &found {
                if let Some(expectations) = plan.files.get(safe) {
                    for expectation in expectations {
                        hash_units.push((safe, on_disk.as_path(), expectation));
                    }
                }
            }
            let hashing = self.pool.run(hash_units, cancel, |(safe, on_disk, expectation)| {
                hash_unit(&outcomes, safe, on_disk, expectation)
            });
            skipped += hashing.skipped;
        }

        let mut errors = outcomes.errors.into_inner();
        if !errors.is_empty() {
            return Err(errors.swap_remove(0));
        }

        let mut missing: Vec<String> = outcomes.missing.into_iter().collect();
        missing.sort();
        let mut corrupt: Vec<ChecksumMismatch> =
            outcomes.corrupt.into_iter().map(|(_, m)| m).collect();
        corrupt.sort_by(|a, b| (&a.path, &a.algorithm).cmp(&(&b.path, &b.algorithm)));

        let report = VerificationReport {
            files_declared: plan.files.len(),
            checksums_compared: outcomes.compared.into_inner(),
            missing,
            unlisted,
            corrupt,
            skipped_units: skipped,
        };
        tracing::info!(
            missing = report.missing.len(),
            unlisted = report.unlisted.len(),
            corrupt = report.corrupt.len(),
            compared = report.checksums_compared,
            "manifest verification finished"
        );
        Ok(report)
    }

    /// Verify and report the highest-priority failure, if any.
    pub fn verify_manifests(&self, bag: &Bag, options: InspectOptions) -> BagResult<()> {
        self.inspect(bag, options, &AtomicBool::new(false))?
            .into_result()
    }

    fn plan(&self, bag: &Bag, root: &Path) -> BagResult<Plan> {
        let mut files: BTreeMap<SafePath, Vec<Expectation>> = BTreeMap::new();
        let mut payload_nfc = BTreeSet::new();

        for (is_payload, manifests) in [(true, &bag.payload_manifests), (false, &bag.tag_manifests)]
        {
            let mut path_sets = Vec::with_capacity(manifests.len());
            for manifest in manifests {
                let factory = self.registry.lookup(&manifest.algorithm)?;
                let paths = self.validate_entries(manifest, root)?;
                for (safe, checksum) in &paths {
                    if is_payload {
                        payload_nfc.insert(safe.as_str().nfc().collect::<String>());
                    }
                    files.entry(safe.clone()).or_default().push(Expectation {
                        algorithm: manifest.algorithm.clone(),
                        expected: checksum.to_string(),
                        factory,
                    });
                }
                path_sets.push((
                    manifest.algorithm.as_str(),
                    paths.into_keys().collect::<BTreeSet<_>>(),
                ));
            }
            check_same_path_set(&path_sets)?;
        }

        Ok(Plan { files, payload_nfc })
    }

    fn validate_entries<'m>(
        &self,
        manifest: &'m Manifest,
        root: &Path,
    ) -> BagResult<BTreeMap<SafePath, &'m str>> {
        let mut paths = BTreeMap::new();
        for (raw, checksum) in &manifest.entries {
            let safe = validate_against_root(raw, root, &self.policy)?;
            paths.insert(safe, checksum.as_str());
        }
        Ok(paths)
    }
}

fn hash_unit(outcomes: &Outcomes, safe: &SafePath, on_disk: &Path, expectation: &Expectation) {
    match hash_file(on_disk, expectation.factory) {
        Ok(actual) => {
            outcomes.compared.fetch_add(1, Ordering::Relaxed);
            if actual != expectation.expected {
                tracing::debug!(
                    path = %safe,
                    algorithm = %expectation.algorithm,
                    "checksum mismatch"
                );
                outcomes.corrupt.insert(
                    (safe.as_str().to_string(), expectation.algorithm.clone()),
                    ChecksumMismatch {
                        path: safe.as_str().to_string(),
                        algorithm: expectation.algorithm.clone(),
                        expected: expectation.expected.clone(),
                        actual,
                    },
                );
            }
        }
        Err(e) => outcomes.errors.lock().push(e.into()),
    }
}

/// Every manifest in the group must list the union of the group's paths.
fn check_same_path_set(path_sets: &[(&str, BTreeSet<SafePath>)]) -> BagResult<()> {
    if path_sets.len() < 2 {
        return Ok(());
    }
    let union: BTreeSet<&SafePath> = path_sets.iter().flat_map(|(_, set)| set.iter()).collect();
    for (algorithm, set) in path_sets {
        if let Some(absent) = union.iter().find(|p| !set.contains(**p)) {
            return Err(BagError::FileNotInManifest {
                path: absent.as_str().to_string(),
                manifest: Some(algorithm.to_string()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagit_core::{Version, BagError};
    use bagit_crypto::hash_bytes;
    use digest::DynDigest;
    use std::fs;

    struct Fixture {
        _dir: tempfile::TempDir,
        bag: Bag,
    }

    fn sha256(data: &[u8]) -> String {
        hash_bytes(data, AlgorithmRegistry::standard().lookup("sha256").unwrap())
    }

    fn md5(data: &[u8]) -> String {
        hash_bytes(data, AlgorithmRegistry::standard().lookup("md5").unwrap())
    }

    /// A 0.97 bag on disk whose payload manifests cover every file.
    fn fixture(files: &[(&str, &[u8])]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let mut sha = Manifest::new("sha256");
        let mut md = Manifest::new("md5");
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            sha.insert(*name, &sha256(content));
            md.insert(*name, &md5(content));
        }
        let mut bag = Bag::new(Version::new(0, 97));
        bag.set_payload_manifest(sha);
        bag.set_payload_manifest(md);
        bag.root_dir = Some(dir.path().to_path_buf());
        Fixture { _dir: dir, bag }
    }

    fn verifier() -> ManifestVerifier {
        ManifestVerifier::new(
            AlgorithmRegistry::standard(),
            WorkerPool::new(4),
            PathPolicy::default(),
        )
    }

    fn root(f: &Fixture) -> &Path {
        f.bag.root_dir.as_deref().unwrap()
    }

    #[test]
    fn clean_bag_passes() {
        let f = fixture(&[("data/a.txt", b"alpha"), ("data/sub/b.txt", b"beta")]);
        let report = verifier()
            .inspect(&f.bag, InspectOptions::default(), &AtomicBool::new(false))
            .unwrap();
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(report.files_declared, 2);
        assert_eq!(report.checksums_compared, 4);
        verifier()
            .verify_manifests(&f.bag, InspectOptions::default())
            .unwrap();
    }

    #[test]
    fn missing_file_is_reported() {
        let f = fixture(&[("data/a.txt", b"alpha"), ("data/b.txt", b"beta")]);
        fs::remove_file(root(&f).join("data/b.txt")).unwrap();
        match verifier().verify_manifests(&f.bag, InspectOptions::default()) {
            Err(BagError::FileNotInPayloadDirectory { paths }) => {
                assert_eq!(paths, vec!["data/b.txt".to_string()])
            }
            other => panic!("expected FileNotInPayloadDirectory, got {other:?}"),
        }
    }

    #[test]
    fn unlisted_payload_file_is_reported() {
        let f = fixture(&[("data/a.txt", b"alpha")]);
        fs::write(root(&f).join("data/extra.txt"), "surprise").unwrap();
        match verifier().verify_manifests(&f.bag, InspectOptions::default()) {
            Err(BagError::FileNotInManifest { path, manifest: None }) => {
                assert_eq!(path, "data/extra.txt")
            }
            other => panic!("expected FileNotInManifest, got {other:?}"),
        }
    }

    #[test]
    fn hidden_unlisted_files_respect_ignore_flag() {
        let f = fixture(&[("data/a.txt", b"alpha")]);
        fs::write(root(&f).join("data/.DS_Store"), "junk").unwrap();
        assert!(verifier()
            .verify_manifests(&f.bag, InspectOptions::default())
            .is_err());
        let ignoring = InspectOptions {
            ignore_hidden: true,
            ..InspectOptions::default()
        };
        verifier().verify_manifests(&f.bag, ignoring).unwrap();
    }

    #[test]
    fn corruption_names_first_file_and_counts_the_rest() {
        let f = fixture(&[("data/a.txt", b"alpha"), ("data/b.txt", b"beta")]);
        fs::write(root(&f).join("data/a.txt"), "ALPHA").unwrap();
        fs::write(root(&f).join("data/b.txt"), "BETA").unwrap();
        let report = verifier()
            .inspect(&f.bag, InspectOptions::default(), &AtomicBool::new(false))
            .unwrap();
        // Two files, two algorithms each.
        assert_eq!(report.corrupt.len(), 4);
        match report.into_result() {
            Err(BagError::CorruptChecksum {
                path,
                algorithm,
                expected,
                actual,
                additional,
            }) => {
                assert_eq!(path, "data/a.txt");
                assert_eq!(algorithm, "md5");
                assert_eq!(expected, md5(b"alpha"));
                assert_eq!(actual, md5(b"ALPHA"));
                assert_eq!(additional, 3);
            }
            other => panic!("expected CorruptChecksum, got {other:?}"),
        }
    }

    #[test]
    fn missing_outranks_corruption() {
        let f = fixture(&[("data/a.txt", b"alpha"), ("data/b.txt", b"beta")]);
        fs::write(root(&f).join("data/a.txt"), "tampered").unwrap();
        fs::remove_file(root(&f).join("data/b.txt")).unwrap();
        let report = verifier()
            .inspect(&f.bag, InspectOptions::default(), &AtomicBool::new(false))
            .unwrap();
        assert_eq!(report.missing, vec!["data/b.txt".to_string()]);
        assert_eq!(report.corrupt.len(), 2);
        assert!(matches!(
            report.first_failure(),
            Some(BagError::FileNotInPayloadDirectory { .. })
        ));
    }

    #[test]
    fn completeness_only_skips_hashing() {
        let f = fixture(&[("data/a.txt", b"alpha")]);
        fs::write(root(&f).join("data/a.txt"), "tampered").unwrap();
        let options = InspectOptions {
            hash_contents: false,
            ..InspectOptions::default()
        };
        let report = verifier()
            .inspect(&f.bag, options, &AtomicBool::new(false))
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.checksums_compared, 0);
    }

    static HASHERS_BUILT: AtomicUsize = AtomicUsize::new(0);

    fn counting_sha256() -> Box<dyn DynDigest + Send> {
        HASHERS_BUILT.fetch_add(1, Ordering::SeqCst);
        Box::new(sha2::Sha256::default())
    }

    #[test]
    fn unsafe_path_aborts_before_any_hashing() {
        let f = fixture(&[("data/a.txt", b"alpha")]);
        let mut manifest = Manifest::new("counting");
        manifest.insert("data/a.txt", &sha256(b"alpha"));
        manifest.insert("../../etc/passwd", &sha256(b"root"));
        let mut bag = f.bag.clone();
        bag.payload_manifests.clear();
        bag.set_payload_manifest(manifest);

        let mut registry = AlgorithmRegistry::empty();
        registry.register("counting", counting_sha256);
        let verifier = ManifestVerifier::new(registry, WorkerPool::new(2), PathPolicy::default());

        let err = verifier
            .verify_manifests(&bag, InspectOptions::default())
            .unwrap_err();
        assert!(err.is_security(), "{err:?}");
        assert_eq!(HASHERS_BUILT.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn backslash_path_is_a_format_error() {
        let f = fixture(&[("data/a.txt", b"alpha")]);
        let mut bag = f.bag.clone();
        let mut manifest = Manifest::new("sha256");
        manifest.insert("data\\a.txt", &sha256(b"alpha"));
        bag.set_payload_manifest(manifest);
        let err = verifier()
            .verify_manifests(&bag, InspectOptions::default())
            .unwrap_err();
        assert!(matches!(err, BagError::InvalidFormat { .. }));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let f = fixture(&[("data/a.txt", b"alpha")]);
        let mut bag = f.bag.clone();
        let mut manifest = Manifest::new("whirlpool");
        manifest.insert("data/a.txt", "00");
        bag.set_payload_manifest(manifest);
        let err = verifier()
            .verify_manifests(&bag, InspectOptions::default())
            .unwrap_err();
        assert!(matches!(err, BagError::UnsupportedAlgorithm { algorithm } if algorithm == "whirlpool"));
    }

    #[test]
    fn payload_manifests_must_agree_on_paths() {
        let mut f = fixture(&[("data/a.txt", b"alpha"), ("data/b.txt", b"beta")]);
        let mut md = Manifest::new("md5");
        md.insert("data/a.txt", &md5(b"alpha"));
        f.bag.set_payload_manifest(md);
        match verifier().verify_manifests(&f.bag, InspectOptions::default()) {
            Err(BagError::FileNotInManifest {
                path,
                manifest: Some(algorithm),
            }) => {
                assert_eq!(path, "data/b.txt");
                assert_eq!(algorithm, "md5");
            }
            other => panic!("expected FileNotInManifest, got {other:?}"),
        }
    }

    #[test]
    fn tag_manifests_are_verified_and_unlisted_tag_files_allowed() {
        let mut f = fixture(&[("data/a.txt", b"alpha")]);
        fs::write(root(&f).join("bagit.txt"), "BagIt-Version: 0.97\n").unwrap();
        fs::write(root(&f).join("bag-info.txt"), "Source-Organization: x\n").unwrap();
        let mut tags = Manifest::new("sha256");
        tags.insert("bagit.txt", &sha256(b"BagIt-Version: 0.97\n"));
        f.bag.set_tag_manifest(tags);
        verifier()
            .verify_manifests(&f.bag, InspectOptions::default())
            .unwrap();

        fs::write(root(&f).join("bagit.txt"), "BagIt-Version: 1.0\n").unwrap();
        let err = verifier()
            .verify_manifests(&f.bag, InspectOptions::default())
            .unwrap_err();
        assert!(matches!(err, BagError::CorruptChecksum { path, .. } if path == "bagit.txt"));
    }

    #[test]
    fn cancelled_run_is_not_clean() {
        let f = fixture(&[("data/a.txt", b"alpha")]);
        let report = verifier()
            .inspect(&f.bag, InspectOptions::default(), &AtomicBool::new(true))
            .unwrap();
        assert!(!report.is_clean());
        assert!(matches!(
            report.into_result(),
            Err(BagError::Cancelled { skipped: 1 })
        ));
    }

    #[test]
    fn verification_does_not_mutate_the_bag() {
        let f = fixture(&[("data/a.txt", b"alpha")]);
        let before = f.bag.clone();
        verifier()
            .verify_manifests(&f.bag, InspectOptions::default())
            .unwrap();
        verifier()
            .verify_manifests(&f.bag, InspectOptions::default())
            .unwrap();
        assert_eq!(before, f.bag);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = VerificationReport {
            files_declared: 1,
            missing: vec!["data/x".to_string()],
            ..VerificationReport::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["missing"][0], "data/x");
        assert_eq!(json["files_declared"], 1);
    }
}
