//! # Bag Version
//!
//! The BagIt version determines the on-disk layout:
//!
//! | Version      | Payload location | Control files | Metadata file      |
//! |--------------|------------------|---------------|--------------------|
//! | `< 0.95`     | `data/`          | bag root      | `package-info.txt` |
//! | `0.95..2.0`  | `data/`          | bag root      | `bag-info.txt`     |
//! | `>= 2.0`     | bag root         | `.bagit/`     | `bag-info.txt`     |

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BagError;

/// Name of the payload directory for versions below 2.0.
pub const PAYLOAD_DIR_NAME: &str = "data";

/// Name of the hidden control directory for versions 2.0 and later.
pub const DOT_BAGIT_DIR_NAME: &str = ".bagit";

/// Name of the bagit declaration file.
pub const BAGIT_FILE_NAME: &str = "bagit.txt";

/// Name of the fetch list.
pub const FETCH_FILE_NAME: &str = "fetch.txt";

/// A `major.minor` BagIt version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
}

impl Version {
    /// The version written by default.
    pub const LATEST: Version = Version::new(1, 0);

    /// Create a version from its components.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a `major.minor` string such as `"0.97"`.
    pub fn parse(s: &str) -> Result<Self, BagError> {
        let unparsable = |reason: &str| BagError::InvalidFormat {
            value: s.to_string(),
            reason: format!("unparsable version: {reason}"),
        };
        let trimmed = s.trim();
        let (major, minor) = trimmed
            .split_once('.')
            .ok_or_else(|| unparsable("expected <major>.<minor>"))?;
        if major.is_empty()
            || minor.is_empty()
            || !major.chars().all(|c| c.is_ascii_digit())
            || !minor.chars().all(|c| c.is_ascii_digit())
        {
            return Err(unparsable("components must be decimal digits"));
        }
        let major = major
            .parse::<u32>()
            .map_err(|e| unparsable(&e.to_string()))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|e| unparsable(&e.to_string()))?;
        Ok(Self { major, minor })
    }

    /// True when this version is `other` or newer.
    pub fn is_same_or_newer(&self, other: Version) -> bool {
        *self >= other
    }

    /// Versions 2.0+ keep control files under `.bagit/` and payload at the root.
    pub fn uses_dot_bagit(&self) -> bool {
        self.is_same_or_newer(Version::new(2, 0))
    }

    /// Name of the metadata tag file for this version.
    pub fn metadata_file_name(&self) -> &'static str {
        if *self < Version::new(0, 95) {
            "package-info.txt"
        } else {
            "bag-info.txt"
        }
    }

    /// Root-relative prefix of payload paths in manifests (`"data/"` or `""`).
    pub fn payload_prefix(&self) -> &'static str {
        if self.uses_dot_bagit() {
            ""
        } else {
            "data/"
        }
    }

    /// Root-relative prefix of control files (`""` or `".bagit/"`).
    pub fn control_prefix(&self) -> &'static str {
        if self.uses_dot_bagit() {
            ".bagit/"
        } else {
            ""
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::LATEST
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
