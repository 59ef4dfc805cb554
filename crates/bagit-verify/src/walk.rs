//! Directory walks shared by the quick verifier, the unlisted-file check and
//! the writer.

use std::path::{Path, PathBuf};

use bagit_core::{
    is_hidden_name, payload_dir_for, BagError, BagResult, Version, DOT_BAGIT_DIR_NAME,
};
use walkdir::WalkDir;

/// A regular file found under a walked directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Path relative to the walk base, `/`-separated.
    pub relative: String,
    /// Absolute (or base-joined) path on disk.
    pub path: PathBuf,
    /// Size in bytes.
    pub len: u64,
}

/// Every non-directory entry under `dir`, sorted by path.
///
/// With `ignore_hidden`, dot-entries below `dir` are skipped entirely.
pub fn walk_files(dir: &Path, ignore_hidden: bool) -> BagResult<Vec<WalkedFile>> {
    walk(dir, ignore_hidden, false)
}

fn walk(dir: &Path, ignore_hidden: bool, skip_control_dir: bool) -> BagResult<Vec<WalkedFile>> {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if skip_control_dir
                && entry.depth() == 1
                && entry.file_type().is_dir()
                && name == DOT_BAGIT_DIR_NAME
            {
                return false;
            }
            !(ignore_hidden && is_hidden_name(&name))
        });

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            BagError::io(path, e.into())
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let relative = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let len = entry
            .metadata()
            .map_err(|e| BagError::io(entry.path(), e.into()))?
            .len();
        files.push(WalkedFile {
            relative,
            path: entry.path().to_path_buf(),
            len,
        });
    }
    Ok(files)
}

/// Payload files of a bag, with paths relative to the bag root.
///
/// From 2.0 the payload shares the root with `.bagit`, which is never
/// entered. Returns nothing when the payload directory does not exist.
pub fn walk_payload(root: &Path, version: Version, ignore_hidden: bool) -> BagResult<Vec<WalkedFile>> {
    let dir = payload_dir_for(version, root);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let prefix = version.payload_prefix();
    let mut files = walk(&dir, ignore_hidden, version.uses_dot_bagit())?;
    if !prefix.is_empty() {
        for file in &mut files {
            file.relative = format!("{prefix}{}", file.relative);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walk_optionally_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/.cache")).unwrap();
        fs::write(root.join("a.txt"), "aa").unwrap();
        fs::write(root.join(".hidden"), "h").unwrap();
        fs::write(root.join("sub/b.txt"), "bbb").unwrap();
        fs::write(root.join("sub/.cache/c"), "c").unwrap();

        let all: Vec<String> = walk_files(root, false)
            .unwrap()
            .into_iter()
            .map(|f| f.relative)
            .collect();
        assert_eq!(all, vec![".hidden", "a.txt", "sub/.cache/c", "sub/b.txt"]);

        let visible = walk_files(root, true).unwrap();
        let names: Vec<&str> = visible.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "sub/b.txt"]);
        assert_eq!(visible.iter().map(|f| f.len).sum::<u64>(), 5);
    }

    #[test]
    fn payload_paths_carry_data_prefix_before_2_0() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data/x")).unwrap();
        fs::write(dir.path().join("data/x/f"), "1").unwrap();
        fs::write(dir.path().join("bagit.txt"), "1").unwrap();

        let files = walk_payload(dir.path(), Version::new(0, 97), false).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "data/x/f");
    }

    #[test]
    fn dot_bagit_is_skipped_only_at_a_2_0_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".bagit")).unwrap();
        fs::write(dir.path().join(".bagit/bagit.txt"), "x").unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        let files = walk_payload(dir.path(), Version::new(2, 0), false).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["a.txt"]);

        let old = tempfile::tempdir().unwrap();
        fs::create_dir_all(old.path().join("data/.bagit")).unwrap();
        fs::write(old.path().join("data/.bagit/notes.txt"), "payload").unwrap();
        let files = walk_payload(old.path(), Version::new(1, 0), false).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative, "data/.bagit/notes.txt");
    }

    #[test]
    fn missing_payload_dir_walks_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk_payload(dir.path(), Version::new(1, 0), false)
            .unwrap()
            .is_empty());
    }
}
