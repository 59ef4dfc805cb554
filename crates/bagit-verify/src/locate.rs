//! # Normalization-Tolerant File Lookup
//!
//! A manifest written on one filesystem may record a name in NFC while
//! another filesystem stores it in NFD (or the reverse). Lookup tries, in
//! order: the path as recorded, its NFC form, its NFD form, and finally a
//! component-by-component directory scan comparing NFC forms.

use std::path::{Path, PathBuf};

use bagit_core::SafePath;
use unicode_normalization::UnicodeNormalization;

/// Where a recorded path exists on disk, if anywhere.
pub fn locate(root: &Path, path: &SafePath) -> Option<PathBuf> {
    let direct = path.to_path(root);
    if direct.exists() {
        return Some(direct);
    }

    let raw = path.as_str();
    let nfc: String = raw.nfc().collect();
    let nfd: String = raw.nfd().collect();
    for variant in [&nfc, &nfd] {
        if variant != raw {
            let candidate = join_components(root, variant);
            if candidate.exists() {
                tracing::warn!(recorded = raw, "found file under a different unicode normalization");
                return Some(candidate);
            }
        }
    }

    let found = scan(root, path)?;
    tracing::warn!(
        recorded = raw,
        found = %found.display(),
        "found file by normalization-insensitive directory scan"
    );
    Some(found)
}

fn join_components(root: &Path, relative: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for part in relative.split('/') {
        out.push(part);
    }
    out
}

fn scan(root: &Path, path: &SafePath) -> Option<PathBuf> {
    let mut current = root.to_path_buf();
    for part in path.components() {
        let direct = current.join(part);
        if direct.exists() {
            current = direct;
            continue;
        }
        let wanted: String = part.nfc().collect();
        let entries = std::fs::read_dir(&current).ok()?;
        let matched = entries.filter_map(Result::ok).find(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| name.nfc().eq(wanted.chars()))
                .unwrap_or(false)
        })?;
        current = matched.path();
    }
    Some(current)
}
