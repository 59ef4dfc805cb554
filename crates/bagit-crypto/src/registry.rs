//! # Algorithm Registry
//!
//! Maps checksum algorithm names, as they appear in manifest file names, to
//! constructors of streaming digests. The verifier never names a concrete
//! hash; it asks the registry. New algorithms are added with
//! [`AlgorithmRegistry::register`].
//!
//! Lookup is forgiving about spelling: `SHA-256`, `sha_256` and `sha256`
//! all resolve to the same entry.

use std::collections::BTreeMap;

use digest::DynDigest;

use crate::error::{CryptoError, CryptoResult};

/// Constructor of a fresh streaming digest.
pub type DigestFactory = fn() -> Box<dyn DynDigest + Send>;

#[derive(Clone, Copy)]
struct Entry {
    name: &'static str,
    factory: DigestFactory,
}

/// Name-to-digest lookup table.
#[derive(Clone, Default)]
pub struct AlgorithmRegistry {
    entries: BTreeMap<String, Entry>,
}

impl std::fmt::Debug for AlgorithmRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlgorithmRegistry")
            .field("algorithms", &self.names())
            .finish()
    }
}

fn md5() -> Box<dyn DynDigest + Send> {
    Box::new(md5::Md5::default())
}

fn sha1() -> Box<dyn DynDigest + Send> {
    Box::new(sha1::Sha1::default())
}

fn sha224() -> Box<dyn DynDigest + Send> {
    Box::new(sha2::Sha224::default())
}

fn sha256() -> Box<dyn DynDigest + Send> {
    Box::new(sha2::Sha256::default())
}

fn sha384() -> Box<dyn DynDigest + Send> {
    Box::new(sha2::Sha384::default())
}

fn sha512() -> Box<dyn DynDigest + Send> {
    Box::new(sha2::Sha512::default())
}

fn sha3_256() -> Box<dyn DynDigest + Send> {
    Box::new(sha3::Sha3_256::default())
}

fn sha3_384() -> Box<dyn DynDigest + Send> {
    Box::new(sha3::Sha3_384::default())
}

fn sha3_512() -> Box<dyn DynDigest + Send> {
    Box::new(sha3::Sha3_512::default())
}

/// Lower-case and drop `-` / `_` so spelling variants collide.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl AlgorithmRegistry {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The algorithms commonly found in bags.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("md5", md5);
        registry.register("sha1", sha1);
        registry.register("sha224", sha224);
        registry.register("sha256", sha256);
        registry.register("sha384", sha384);
        registry.register("sha512", sha512);
        registry.register("sha3-256", sha3_256);
        registry.register("sha3-384", sha3_384);
        registry.register("sha3-512", sha3_512);
        registry
    }

    /// Add or replace an algorithm.
    pub fn register(&mut self, name: &'static str, factory: DigestFactory) {
        self.entries
            .insert(normalize(name), Entry { name, factory });
    }

    /// Constructor for an algorithm, or `UnsupportedAlgorithm`.
    pub fn lookup(&self, name: &str) -> CryptoResult<DigestFactory> {
        self.entries
            .get(&normalize(name))
            .map(|entry| entry.factory)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm {
                algorithm: name.to_string(),
            })
    }

    /// True when the algorithm is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    /// Registered names as given to [`register`](Self::register).
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.values().map(|entry| entry.name).collect()
    }
}
