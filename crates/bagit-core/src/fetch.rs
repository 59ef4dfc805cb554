//! # Fetch Items
//!
//! A fetch item describes payload that is not yet present locally (a
//! "holey" bag). The destination path is validated exactly like a manifest
//! entry before it is trusted.

use serde::{Deserialize, Serialize};

/// One line of `fetch.txt`: `<url> <length|-> <path>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchItem {
    /// Remote location of the file.
    pub url: String,
    /// Length in octets, if known.
    pub length: Option<u64>,
    /// Root-relative destination as recorded (not yet validated).
    pub path: String,
}

impl FetchItem {
    /// Create a fetch item.
    pub fn new(url: impl Into<String>, length: Option<u64>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            length,
            path: path.into(),
        }
    }
}

impl std::fmt::Display for FetchItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.length {
            Some(len) => write!(f, "{} {} {}", self.url, len, self.path),
            None => write!(f, "{} - {}", self.url, self.path),
        }
    }
}
