//! # Bag Verifier
//!
//! Entry point for checking a bag on disk. A bag is **complete** when its
//! structure is sound, nothing is left to fetch, every declared file exists
//! and every payload file is declared. It is **valid** when it is complete
//! and every checksum matches.

use std::sync::atomic::AtomicBool;

use bagit_core::{Bag, BagResult};
use bagit_crypto::AlgorithmRegistry;

use crate::config::VerifierConfig;
use crate::mandatory::{check_fetch_items_resolved, verify_structure};
use crate::manifest::{InspectOptions, ManifestVerifier, VerificationReport};
use crate::quick;

/// Verifies bags according to one configuration.
#[derive(Debug, Clone)]
pub struct BagVerifier {
    config: VerifierConfig,
    manifests: ManifestVerifier,
}

impl Default for BagVerifier {
    fn default() -> Self {
        Self::new(VerifierConfig::default())
    }
}

impl BagVerifier {
    /// Verifier using the standard algorithm registry.
    pub fn new(config: VerifierConfig) -> Self {
        Self::with_registry(config, AlgorithmRegistry::standard())
    }

    /// Verifier using a caller-supplied registry.
    pub fn with_registry(config: VerifierConfig, registry: AlgorithmRegistry) -> Self {
        let manifests = ManifestVerifier::new(registry, config.pool(), config.path_policy());
        Self { config, manifests }
    }

    /// Configuration in use.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Structure, fetch resolution, existence and listing. No hashing.
    pub fn is_complete(&self, bag: &Bag) -> BagResult<()> {
        self.run(bag, false, &AtomicBool::new(false))?.into_result()
    }

    /// Everything [`is_complete`](Self::is_complete) checks, plus checksums
    /// (unless the configuration turns hashing off).
    pub fn is_valid(&self, bag: &Bag) -> BagResult<()> {
        self.run(bag, self.config.hash_contents, &AtomicBool::new(false))?
            .into_result()
    }

    /// Full verification returning every outcome instead of the first
    /// failure. Structural failures still return `Err`.
    pub fn report(&self, bag: &Bag, cancel: &AtomicBool) -> BagResult<VerificationReport> {
        self.run(bag, self.config.hash_contents, cancel)
    }

    /// See [`quick::can_quick_verify`].
    pub fn can_quick_verify(&self, bag: &Bag) -> bool {
        quick::can_quick_verify(bag)
    }

    /// See [`quick::quick_verify`].
    pub fn quick_verify(&self, bag: &Bag) -> BagResult<()> {
        quick::quick_verify(bag, self.config.ignore_hidden_files)
    }

    fn run(
        &self,
        bag: &Bag,
        hash_contents: bool,
        cancel: &AtomicBool,
    ) -> BagResult<VerificationReport> {
        let policy = self.config.path_policy();
        verify_structure(bag, self.config.tolerate_missing_bagit_file, &policy)?;
        check_fetch_items_resolved(bag, &policy)?;
        let options = InspectOptions {
            ignore_hidden: self.config.ignore_hidden_files,
            hash_contents,
        };
        self.manifests.inspect(bag, options, cancel)
    }
}
