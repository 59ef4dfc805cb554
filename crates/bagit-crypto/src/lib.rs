//! # bagit-crypto — Checksum Algorithms for BagIt
//!
//! - **Algorithm registry** mapping manifest algorithm names (`md5`,
//!   `sha256`, `sha3-512`, ...) to streaming digest constructors. Callers
//!   may register more without changing the verifier.
//! - **Streaming hashing** of files in 64 KiB chunks, with a multi-digest
//!   variant that reads each file once.
//!
//! Checksums are always rendered as lower-case hex.

pub mod error;
pub mod hasher;
pub mod registry;

pub use error::{CryptoError, CryptoResult};
pub use hasher::{hash_bytes, hash_file, hash_file_multi, hash_reader, CHUNK_SIZE};
pub use registry::{AlgorithmRegistry, DigestFactory};
