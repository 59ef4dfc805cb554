//! # Path Safety Validator
//!
//! Every path read from a manifest or fetch list is untrusted. Before any
//! file is opened, the raw string is validated and normalized into a
//! [`SafePath`]: a root-relative, forward-slash path that cannot escape the
//! bag root.
//!
//! ## Rules
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. A single leading `*` (binary-mode marker) is stripped.
//! 2. Empty paths and NUL bytes are format errors.
//! 3. A backslash anywhere is a format error. Manifests use `/` only.
//! 4. A leading `~` is a security error.
//! 5. Absolute paths (`/x`, `C:`, `scheme://`) are security errors. A
//!    `file://` URI is accepted only when resolved against a bag root and it
//!    lands inside that root.
//! 6. `%0A` / `%0D` are decoded, then `.` and `..` are resolved by tracking
//!    depth. Rising above the root is a security error.
//! 7. Reserved device names are a format error when the policy asks for it.
//!
//! Security errors mean "this entry points outside the bag"; format errors
//! mean "this entry is malformed". Callers keep the two apart.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BagError;

/// Device names Windows refuses to create, with or without an extension.
const RESERVED_NAMES: &[&str] = &[
    "aux", "con", "nul", "prn", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Knobs for path validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPolicy {
    /// Reject components that are reserved device names.
    pub reject_reserved_names: bool,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self {
            reject_reserved_names: cfg!(windows),
        }
    }
}

impl PathPolicy {
    /// Policy that rejects reserved names on every platform.
    pub fn strict() -> Self {
        Self {
            reject_reserved_names: true,
        }
    }
}

/// Why a raw path was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The entry is malformed.
    #[error("invalid path {raw:?}: {reason}")]
    Format {
        /// Raw value as recorded.
        raw: String,
        /// Rule that rejected it.
        reason: String,
    },

    /// The entry points outside the bag.
    #[error("malicious path {raw:?}: {reason}")]
    Malicious {
        /// Raw value as recorded.
        raw: String,
        /// Rule that rejected it.
        reason: String,
    },
}

impl PathError {
    fn format(raw: &str, reason: &str) -> Self {
        Self::Format {
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }

    fn malicious(raw: &str, reason: &str) -> Self {
        Self::Malicious {
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }

    /// True when the entry tried to leave the bag.
    pub fn is_security(&self) -> bool {
        matches!(self, Self::Malicious { .. })
    }
}

impl From<PathError> for BagError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Format { raw, reason } => BagError::InvalidFormat { value: raw, reason },
            PathError::Malicious { raw, reason } => BagError::MaliciousPath { path: raw, reason },
        }
    }
}

/// A validated, normalized, root-relative path.
///
/// Always non-empty, never absolute, never containing `.`, `..`, empty
/// components or backslashes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SafePath(String);

impl SafePath {
    /// The normalized path with `/` separators.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve against a bag root.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut out = root.to_path_buf();
        for part in self.components() {
            out.push(part);
        }
        out
    }

    /// Path components in order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Last component.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// True when the first component equals `dir` (`dir` has no slashes).
    pub fn starts_with_dir(&self, dir: &str) -> bool {
        self.components().next() == Some(dir) && self.0.len() > dir.len()
    }

    /// True when any component starts with a dot.
    pub fn is_hidden(&self) -> bool {
        self.components().any(is_hidden_name)
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SafePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// True for dot-files and dot-directories.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

/// Decode the BagIt filename escapes for line breaks.
pub fn decode_filename(encoded: &str) -> String {
    encoded.replace("%0A", "\n").replace("%0D", "\r")
}

/// Encode line breaks so a path fits on one manifest line.
pub fn encode_filename(path: &str) -> String {
    path.replace('\n', "%0A").replace('\r', "%0D")
}

/// Validate a manifest or fetch entry without a bag root.
///
/// `file://` URIs are rejected here since there is no root to resolve them
/// against; use [`validate_against_root`] when one is available.
pub fn validate_manifest_path(raw: &str, policy: &PathPolicy) -> Result<SafePath, PathError> {
    validate(raw, None, policy)
}

/// Validate an entry, resolving `file://` URIs against `root`.
pub fn validate_against_root(
    raw: &str,
    root: &Path,
    policy: &PathPolicy,
) -> Result<SafePath, PathError> {
    validate(raw, Some(root), policy)
}

fn validate(raw: &str, root: Option<&Path>, policy: &PathPolicy) -> Result<SafePath, PathError> {
    let stripped = match raw.strip_prefix('*') {
        Some(rest) => {
            tracing::warn!(path = raw, "stripping leading '*' from manifest path");
            rest
        }
        None => raw,
    };

    if stripped.is_empty() {
        return Err(PathError::format(raw, "empty path"));
    }
    if stripped.contains('\0') {
        return Err(PathError::format(raw, "contains a NUL byte"));
    }
    if stripped.contains('\\') {
        return Err(PathError::format(
            raw,
            "contains a backslash; manifest paths must use '/'",
        ));
    }
    if stripped.starts_with('~') {
        return Err(PathError::malicious(raw, "starts with '~'"));
    }
    if stripped.starts_with('/') {
        return Err(PathError::malicious(raw, "absolute path"));
    }
    if has_drive_letter(stripped) {
        return Err(PathError::malicious(raw, "absolute path with a drive letter"));
    }

    let relative = match uri_scheme(stripped) {
        Some(scheme) if scheme.eq_ignore_ascii_case("file") => {
            let root = root.ok_or_else(|| {
                PathError::malicious(raw, "file URI cannot be resolved without a bag root")
            })?;
            relativize_file_uri(raw, &stripped[scheme.len() + 3..], root)?
        }
        Some(_) => return Err(PathError::malicious(raw, "URI paths are not allowed")),
        None => stripped.to_string(),
    };

    let decoded = decode_filename(&relative);
    let mut parts: Vec<&str> = Vec::new();
    for part in decoded.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(PathError::malicious(raw, "escapes the bag root"));
                }
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(PathError::format(raw, "resolves to the bag root itself"));
    }

    if policy.reject_reserved_names {
        if let Some(part) = parts.iter().find(|p| is_reserved_name(p)) {
            return Err(PathError::format(
                raw,
                &format!("component {part:?} is a reserved device name"),
            ));
        }
    }

    Ok(SafePath(parts.join("/")))
}

fn has_drive_letter(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// The scheme of a `scheme://` prefix, if the string has one.
fn uri_scheme(s: &str) -> Option<&str> {
    let idx = s.find("://")?;
    let scheme = &s[..idx];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    {
        Some(scheme)
    } else {
        None
    }
}

/// Turn the path part of a `file://` URI into a root-relative string.
fn relativize_file_uri(raw: &str, uri_path: &str, root: &Path) -> Result<String, PathError> {
    let target = lexical_normalize(Path::new(uri_path));
    let root = lexical_normalize(&absolute(root));
    let rel = target
        .strip_prefix(&root)
        .map_err(|_| PathError::malicious(raw, "file URI points outside the bag root"))?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_reserved_name(component: &str) -> bool {
    let stem = component.split('.').next().unwrap_or(component);
    RESERVED_NAMES
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
}
