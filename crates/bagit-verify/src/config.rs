//! # Verifier Configuration
//!
//! Settings shared by verification and writing. Loaded from YAML or JSON,
//! with environment variables taking precedence over file values:
//!
//! | Variable              | Field                 |
//! |-----------------------|-----------------------|
//! | `BAGIT_WORKERS`       | `workers`             |
//! | `BAGIT_IGNORE_HIDDEN` | `ignore_hidden_files` |
//!
//! Missing fields fall back to their defaults.

use std::path::{Path, PathBuf};

use bagit_core::PathPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pool::WorkerPool;

/// Environment variable overriding `workers`.
pub const ENV_WORKERS: &str = "BAGIT_WORKERS";

/// Environment variable overriding `ignore_hidden_files`.
pub const ENV_IGNORE_HIDDEN: &str = "BAGIT_IGNORE_HIDDEN";

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// YAML did not match the expected shape.
    #[error("invalid YAML in {path}: {source}")]
    YamlParse {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        source: serde_yaml::Error,
    },

    /// JSON did not match the expected shape.
    #[error("invalid JSON config: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Value found.
        value: String,
    },
}

/// Options for verification and writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Worker threads; 0 means the machine's available parallelism.
    #[serde(default)]
    pub workers: usize,

    /// Skip dot-files and dot-directories when walking the payload.
    #[serde(default)]
    pub ignore_hidden_files: bool,

    /// Accept a bag without `bagit.txt`.
    #[serde(default)]
    pub tolerate_missing_bagit_file: bool,

    /// Reject reserved device names in manifest paths.
    #[serde(default = "default_reject_reserved_names")]
    pub reject_reserved_names: bool,

    /// Compare checksums after existence checks. Off means completeness only.
    #[serde(default = "default_hash_contents")]
    pub hash_contents: bool,
}

fn default_reject_reserved_names() -> bool {
    PathPolicy::default().reject_reserved_names
}

fn default_hash_contents() -> bool {
    true
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            ignore_hidden_files: false,
            tolerate_missing_bagit_file: false,
            reject_reserved_names: default_reject_reserved_names(),
            hash_contents: default_hash_contents(),
        }
    }
}

impl VerifierConfig {
    /// Load from a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `BAGIT_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable source.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_WORKERS) {
            self.workers = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_WORKERS,
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup(ENV_IGNORE_HIDDEN) {
            self.ignore_hidden_files = parse_bool(&value).ok_or(ConfigError::InvalidEnv {
                var: ENV_IGNORE_HIDDEN,
                value: value.clone(),
            })?;
        }
        Ok(self)
    }

    /// Path validation policy implied by this config.
    pub fn path_policy(&self) -> PathPolicy {
        PathPolicy {
            reject_reserved_names: self.reject_reserved_names,
        }
    }

    /// Worker pool sized by this config.
    pub fn pool(&self) -> WorkerPool {
        WorkerPool::new(self.workers)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
