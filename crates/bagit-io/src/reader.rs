//! # Bag Reader
//!
//! Parses the tag files of a bag on disk into a [`Bag`]. Manifest and fetch
//! paths are kept exactly as recorded; validating them is the verifier's
//! job, so a hostile bag can still be read and then rejected with a
//! precise error.
//!
//! Only UTF-8 tag files are supported.

use std::path::Path;

use bagit_core::{
    bagit_dir_for, Bag, BagError, BagResult, FetchItem, Manifest, ManifestKind, Metadata,
    Version, BAGIT_FILE_NAME, DEFAULT_FILE_ENCODING, DOT_BAGIT_DIR_NAME, FETCH_FILE_NAME,
};

/// Reads bags from directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct BagReader {
    tolerate_missing_declaration: bool,
}

impl BagReader {
    /// Read a bag, requiring `bagit.txt`.
    pub fn read(root: &Path) -> BagResult<Bag> {
        Self::default().read_bag(root)
    }

    /// Read a bag whose `bagit.txt` may be absent. The version then defaults
    /// to 2.0 when a `.bagit` directory exists, otherwise to the latest.
    pub fn read_tolerating_missing_declaration(root: &Path) -> BagResult<Bag> {
        Self {
            tolerate_missing_declaration: true,
        }
        .read_bag(root)
    }

    fn read_bag(&self, root: &Path) -> BagResult<Bag> {
        tracing::info!(root = %root.display(), "reading bag");
        let dot_bagit = root.join(DOT_BAGIT_DIR_NAME);
        let declaration = if dot_bagit.join(BAGIT_FILE_NAME).is_file() {
            Some(dot_bagit.join(BAGIT_FILE_NAME))
        } else if root.join(BAGIT_FILE_NAME).is_file() {
            Some(root.join(BAGIT_FILE_NAME))
        } else {
            None
        };

        let (version, encoding) = match declaration {
            Some(path) => read_declaration(&path)?,
            None if self.tolerate_missing_declaration => {
                let version = if dot_bagit.is_dir() {
                    Version::new(2, 0)
                } else {
                    Version::LATEST
                };
                tracing::warn!(%version, "no bagit declaration; assuming version");
                (version, DEFAULT_FILE_ENCODING.to_string())
            }
            None => {
                return Err(BagError::MissingBagitFile {
                    path: root.join(BAGIT_FILE_NAME),
                })
            }
        };

        let mut bag = Bag::new(version);
        bag.file_encoding = encoding;
        bag.root_dir = Some(root.to_path_buf());

        let control = bagit_dir_for(version, root);
        read_manifests(&control, &mut bag)?;

        let metadata_path = control.join(version.metadata_file_name());
        if metadata_path.is_file() {
            bag.metadata = read_metadata(&metadata_path)?;
        }
        let fetch_path = control.join(FETCH_FILE_NAME);
        if fetch_path.is_file() {
            bag.items_to_fetch = read_fetch(&fetch_path)?;
        }

        tracing::debug!(
            %version,
            payload_manifests = bag.payload_manifests.len(),
            tag_manifests = bag.tag_manifests.len(),
            fetch_items = bag.items_to_fetch.len(),
            "read bag"
        );
        Ok(bag)
    }
}

fn read_utf8(path: &Path) -> BagResult<String> {
    std::fs::read_to_string(path).map_err(|e| BagError::io(path, e))
}

fn malformed(path: &Path, line: &str, reason: &str) -> BagError {
    BagError::InvalidFormat {
        value: line.to_string(),
        reason: format!("{reason} in {}", path.display()),
    }
}

/// Parse `label: value` lines. Lines starting with whitespace continue the
/// previous value. Blank lines are skipped.
pub fn read_key_values(path: &Path) -> BagResult<Vec<(String, String)>> {
    let content = read_utf8(path)?;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = pairs.last_mut() {
                value.push('\n');
                value.push_str(line);
                continue;
            }
        }
        let (label, value) = line
            .split_once(':')
            .ok_or_else(|| malformed(path, line, "expected 'label: value'"))?;
        pairs.push((label.trim().to_string(), value.trim().to_string()));
    }
    Ok(pairs)
}

/// Version and encoding from `bagit.txt`.
pub fn read_declaration(path: &Path) -> BagResult<(Version, String)> {
    let mut version = None;
    let mut encoding = None;
    for (label, value) in read_key_values(path)? {
        match label.as_str() {
            "BagIt-Version" => version = Some(Version::parse(&value)?),
            "Tag-File-Character-Encoding" => encoding = Some(value),
            other => tracing::debug!(label = other, "ignoring bagit.txt entry"),
        }
    }
    let version = version.ok_or_else(|| malformed(path, "", "missing BagIt-Version"))?;
    let encoding = encoding.unwrap_or_else(|| DEFAULT_FILE_ENCODING.to_string());
    let normalized = encoding.to_ascii_uppercase().replace('_', "-");
    if normalized != "UTF-8" && normalized != "UTF8" {
        return Err(BagError::InvalidFormat {
            value: encoding,
            reason: "only UTF-8 tag files are supported".to_string(),
        });
    }
    Ok((version, DEFAULT_FILE_ENCODING.to_string()))
}

/// Parse a manifest file. Paths are kept raw.
pub fn read_manifest(path: &Path, algorithm: &str) -> BagResult<Manifest> {
    let content = read_utf8(path)?;
    let mut manifest = Manifest::new(algorithm);
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let (checksum, file) = line
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(|| malformed(path, line, "expected '<checksum> <path>'"))?;
        let file = file.trim_start();
        if file.is_empty() {
            return Err(malformed(path, line, "manifest line has no path"));
        }
        manifest.insert(file, checksum);
    }
    Ok(manifest)
}

fn read_manifests(control: &Path, bag: &mut Bag) -> BagResult<()> {
    let entries = std::fs::read_dir(control).map_err(|e| BagError::io(control, e))?;
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BagError::io(control, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some((kind, algorithm)) = Manifest::parse_file_name(&name) {
            found.push((name, kind, algorithm, entry.path()));
        }
    }
    found.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, kind, algorithm, path) in found {
        tracing::debug!(file = %name, %kind, "reading manifest");
        let manifest = read_manifest(&path, &algorithm)?;
        match kind {
            ManifestKind::Payload => bag.set_payload_manifest(manifest),
            ManifestKind::Tag => bag.set_tag_manifest(manifest),
        }
    }
    Ok(())
}

/// Parse the bag-info (or package-info) file.
pub fn read_metadata(path: &Path) -> BagResult<Metadata> {
    let mut metadata = Metadata::new();
    for (label, value) in read_key_values(path)? {
        metadata.add(label, value);
    }
    Ok(metadata)
}

/// Parse `fetch.txt`.
pub fn read_fetch(path: &Path) -> BagResult<Vec<FetchItem>> {
    let content = read_utf8(path)?;
    let mut items = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.trim_start().splitn(3, char::is_whitespace);
        let (url, length, file) = match (parts.next(), parts.next(), parts.next()) {
            (Some(url), Some(length), Some(file)) if !file.trim().is_empty() => {
                (url, length, file.trim_start())
            }
            _ => return Err(malformed(path, line, "expected '<url> <length> <path>'")),
        };
        let length = match length {
            "-" => None,
            n => Some(
                n.parse::<u64>()
                    .map_err(|_| malformed(path, line, "length must be digits or '-'"))?,
            ),
        };
        items.push(FetchItem::new(url, length, file));
    }
    Ok(items)
}
