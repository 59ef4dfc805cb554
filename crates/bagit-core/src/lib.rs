//! # bagit-core — Bag Data Model and Path Safety
//!
//! Foundational types for the BagIt integrity engine. Every other crate in
//! the workspace depends on this one; it depends on nothing internal.
//!
//! ## Modules
//!
//! - [`version`]: BagIt version and the layout rules it implies.
//! - [`manifest`]: one algorithm's `path -> checksum` ledger.
//! - [`fetch`]: payload entries still to be fetched.
//! - [`metadata`]: bag-info pairs and the Payload-Oxum summary.
//! - [`bag`]: the aggregate tying the above to a root directory.
//! - [`path`]: validation of untrusted manifest and fetch paths.
//! - [`error`]: the shared [`BagError`] taxonomy.
//!
//! ## Crate Policy
//!
//! - No I/O beyond path arithmetic. Reading, hashing, and writing live in
//!   `bagit-io`, `bagit-crypto`, and `bagit-verify`.
//! - Manifest keys stay raw strings until [`path::validate_manifest_path`]
//!   turns them into [`SafePath`]s.

pub mod bag;
pub mod error;
pub mod fetch;
pub mod manifest;
pub mod metadata;
pub mod path;
pub mod version;

pub use bag::{bagit_dir_for, payload_dir_for, Bag, DEFAULT_FILE_ENCODING};
pub use error::{BagError, BagResult, OxumField};
pub use fetch::FetchItem;
pub use manifest::{Manifest, ManifestKind};
pub use metadata::{Metadata, PayloadOxum, BAGGING_DATE, PAYLOAD_OXUM};
pub use path::{
    decode_filename, encode_filename, is_hidden_name, validate_against_root,
    validate_manifest_path, PathError, PathPolicy, SafePath,
};
pub use version::{
    Version, BAGIT_FILE_NAME, DOT_BAGIT_DIR_NAME, FETCH_FILE_NAME, PAYLOAD_DIR_NAME,
};
