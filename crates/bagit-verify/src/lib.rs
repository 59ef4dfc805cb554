//! # bagit-verify — Bag Verification
//!
//! Checks bags on disk at three levels of cost:
//!
//! - **Structure** ([`mandatory`]): required files and directories exist and
//!   fetch destinations stay inside the payload. No file contents are read.
//! - **Quick** ([`quick`]): the recorded Payload-Oxum matches one walk of the
//!   payload directory.
//! - **Full** ([`manifest`]): every declared file exists, every payload file
//!   is declared, every checksum matches. Runs on a scoped [`WorkerPool`].
//!
//! [`BagVerifier`] combines them behind `is_complete` / `is_valid`.
//!
//! ## Concurrency
//!
//! Each run owns its pool and accumulator; nothing is shared between runs.
//! The bag is only read. Joining the pool is the barrier before results are
//! aggregated.

pub mod config;
pub mod locate;
pub mod mandatory;
pub mod manifest;
pub mod pool;
pub mod quick;
pub mod verifier;
pub mod walk;

pub use config::{ConfigError, VerifierConfig};
pub use manifest::{ChecksumMismatch, InspectOptions, ManifestVerifier, VerificationReport};
pub use pool::{PoolStats, WorkerPool};
pub use quick::{calculate_payload_oxum, can_quick_verify, quick_verify};
pub use verifier::BagVerifier;
pub use walk::{walk_files, walk_payload, WalkedFile};
