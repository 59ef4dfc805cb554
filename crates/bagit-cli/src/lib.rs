//! # bagit-cli — Command-Line Interface for Bags
//!
//! Provides the `bagit` binary over the library crates.
//!
//! ## Subcommands
//!
//! - `bagit verify`: structure, completeness, validity or Payload-Oxum.
//! - `bagit write`: rewrite a bag to a new location.
//! - `bagit create`: turn a directory into a bag in place.
//!
//! ```bash
//! bagit verify ./my-bag
//! bagit verify ./my-bag --quick
//! bagit verify ./my-bag --json --workers 8
//! bagit write ./my-bag /archive/my-bag
//! bagit create ./incoming --algorithm md5 --algorithm sha256 --version 0.97
//! ```
//!
//! Every handler returns the process exit code on success. Failures are
//! returned as errors and logged by `main`.

pub mod create;
pub mod verify;
pub mod write;

use std::path::Path;

use anyhow::{Context, Result};
use bagit_verify::VerifierConfig;

/// Load the configuration file if one was given, then apply `BAGIT_*`
/// environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<VerifierConfig> {
    let config = match path {
        Some(path) => VerifierConfig::from_yaml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VerifierConfig::default(),
    };
    let config = config.with_env_overrides()?;
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}
