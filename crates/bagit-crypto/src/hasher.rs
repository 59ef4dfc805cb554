//! # Streaming File Hashing
//!
//! Files are read in fixed-size chunks so memory stays flat regardless of
//! payload size. [`hash_file_multi`] feeds several digests from a single
//! read of the file, which is what bag creation wants.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CryptoError, CryptoResult};
use crate::registry::DigestFactory;

/// Read buffer size.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Lower-case hex checksum of an in-memory buffer.
pub fn hash_bytes(data: &[u8], factory: DigestFactory) -> String {
    let mut digest = factory();
    digest.update(data);
    hex::encode(digest.finalize())
}

/// Lower-case hex checksum of everything a reader yields.
pub fn hash_reader<R: Read>(mut reader: R, factory: DigestFactory) -> std::io::Result<String> {
    let mut digest = factory();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        digest.update(&buf[..n]);
    }
    Ok(hex::encode(digest.finalize()))
}

/// Lower-case hex checksum of a file.
pub fn hash_file(path: &Path, factory: DigestFactory) -> CryptoResult<String> {
    let io_err = |source| CryptoError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    let checksum = hash_reader(file, factory).map_err(io_err)?;
    tracing::trace!(path = %path.display(), %checksum, "hashed file");
    Ok(checksum)
}

/// Checksums of a file under several algorithms, reading it once.
///
/// Returns `algorithm name -> hex checksum`.
pub fn hash_file_multi(
    path: &Path,
    algorithms: &[(&str, DigestFactory)],
) -> CryptoResult<BTreeMap<String, String>> {
    let io_err = |source| CryptoError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut digests: Vec<_> = algorithms
        .iter()
        .map(|(name, factory)| (*name, factory()))
        .collect();
    let mut file = File::open(path).map_err(io_err)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(io_err)?;
        if n == 0 {
            break;
        }
        for (_, digest) in digests.iter_mut() {
            digest.update(&buf[..n]);
        }
    }
    Ok(digests
        .into_iter()
        .map(|(name, digest)| (name.to_string(), hex::encode(digest.finalize())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AlgorithmRegistry;

    #[test]
    fn hash_file_matches_hash_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        // Larger than one chunk so the loop runs more than once.
        let data: Vec<u8> = (0..(CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let registry = AlgorithmRegistry::standard();
        let factory = registry.lookup("sha256").unwrap();
        assert_eq!(hash_file(&path, factory).unwrap(), hash_bytes(&data, factory));
    }

    #[test]
    fn empty_file_has_well_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();
        let md5 = AlgorithmRegistry::standard().lookup("md5").unwrap();
        assert_eq!(
            hash_file(&path, md5).unwrap(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope");
        let md5 = AlgorithmRegistry::standard().lookup("md5").unwrap();
        match hash_file(&path, md5) {
            Err(CryptoError::Io { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn multi_hash_agrees_with_single_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, b"hello bag").unwrap();

        let registry = AlgorithmRegistry::standard();
        let md5 = registry.lookup("md5").unwrap();
        let sha1 = registry.lookup("sha1").unwrap();
        let all = hash_file_multi(&path, &[("md5", md5), ("sha1", sha1)]).unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all["md5"], hash_file(&path, md5).unwrap());
        assert_eq!(all["sha1"], hash_file(&path, sha1).unwrap());
    }
}
