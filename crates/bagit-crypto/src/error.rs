//! # Checksum Error Types
//!
//! Structured errors for registry lookups and file hashing. Converted into
//! [`BagError`] at crate boundaries.

use std::path::PathBuf;

use bagit_core::BagError;
use thiserror::Error;

/// Errors from checksum computation.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// No digest is registered under this name.
    #[error("unsupported checksum algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// Name as requested.
        algorithm: String,
    },

    /// Reading the file being hashed failed.
    #[error("I/O error hashing {path}: {source}")]
    Io {
        /// File being hashed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result type alias for checksum operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

impl From<CryptoError> for BagError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnsupportedAlgorithm { algorithm } => {
                BagError::UnsupportedAlgorithm { algorithm }
            }
            CryptoError::Io { path, source } => BagError::Io { path, source },
        }
    }
}
