//! # Tag File Writers
//!
//! Serializes the text formats of a bag. Output is UTF-8 with `\n` line
//! endings. Manifest entries come out sorted by path so the same manifest
//! always produces the same bytes.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use bagit_core::{
    encode_filename, BagError, BagResult, FetchItem, Manifest, ManifestKind, Metadata, Version,
    BAGIT_FILE_NAME, FETCH_FILE_NAME,
};

fn write_text(path: PathBuf, contents: &str) -> BagResult<PathBuf> {
    std::fs::write(&path, contents).map_err(|e| BagError::io(&path, e))?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote tag file");
    Ok(path)
}

/// Render `bagit.txt`.
pub fn render_bagit_file(version: Version, encoding: &str) -> String {
    format!("BagIt-Version: {version}\nTag-File-Character-Encoding: {encoding}\n")
}

/// Write `bagit.txt` into the control directory.
pub fn write_bagit_file(control_dir: &Path, version: Version, encoding: &str) -> BagResult<PathBuf> {
    write_text(
        control_dir.join(BAGIT_FILE_NAME),
        &render_bagit_file(version, encoding),
    )
}

/// Render manifest lines: `<checksum>␣␣<path>`.
pub fn render_manifest(manifest: &Manifest) -> String {
    let mut out = String::new();
    for (path, checksum) in &manifest.entries {
        let _ = writeln!(out, "{checksum}  {}", encode_filename(path));
    }
    out
}

/// Write a payload or tag manifest into the control directory.
pub fn write_manifest(
    control_dir: &Path,
    manifest: &Manifest,
    kind: ManifestKind,
) -> BagResult<PathBuf> {
    write_text(
        control_dir.join(manifest.file_name(kind)),
        &render_manifest(manifest),
    )
}

/// Render `label: value` lines in insertion order.
pub fn render_metadata(metadata: &Metadata) -> String {
    let mut out = String::new();
    for (label, value) in metadata.iter() {
        let _ = writeln!(out, "{label}: {value}");
    }
    out
}

/// Write the bag-info file (`package-info.txt` before 0.95).
pub fn write_metadata(
    control_dir: &Path,
    version: Version,
    metadata: &Metadata,
) -> BagResult<PathBuf> {
    write_text(
        control_dir.join(version.metadata_file_name()),
        &render_metadata(metadata),
    )
}

/// Render fetch lines: `<url> <length|-> <path>`.
pub fn render_fetch(items: &[FetchItem]) -> String {
    let mut out = String::new();
    for item in items {
        let length = item
            .length
            .map(|len| len.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{} {} {}", item.url, length, encode_filename(&item.path));
    }
    out
}

/// Write `fetch.txt` into the control directory.
pub fn write_fetch(control_dir: &Path, items: &[FetchItem]) -> BagResult<PathBuf> {
    write_text(control_dir.join(FETCH_FILE_NAME), &render_fetch(items))
}
