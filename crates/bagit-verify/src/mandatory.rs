//! # Structural Checks
//!
//! Cheap checks that never read file contents. They run before any hashing
//! so an incomplete bag fails fast with a specific error instead of a
//! cascade of missing-file reports.

use std::path::Path;

use bagit_core::{
    bagit_dir_for, validate_manifest_path, Bag, BagError, BagResult, Manifest, ManifestKind,
    PathPolicy, Version, BAGIT_FILE_NAME, DOT_BAGIT_DIR_NAME, PAYLOAD_DIR_NAME,
};

use crate::locate::locate;

/// `bagit.txt` must exist in the control directory.
pub fn check_bagit_file_exists(
    root: &Path,
    version: Version,
    tolerate_missing: bool,
) -> BagResult<()> {
    let path = bagit_dir_for(version, root).join(BAGIT_FILE_NAME);
    if path.is_file() {
        return Ok(());
    }
    if tolerate_missing {
        tracing::warn!(path = %path.display(), "bagit declaration file missing; tolerated");
        return Ok(());
    }
    Err(BagError::MissingBagitFile { path })
}

/// At least one `manifest-<algorithm>.txt` must exist in the control directory.
pub fn check_at_least_one_payload_manifest(root: &Path, version: Version) -> BagResult<()> {
    let dir = bagit_dir_for(version, root);
    let entries = match std::fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BagError::MissingPayloadManifest { path: dir });
        }
        Err(e) => return Err(BagError::io(&dir, e)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| BagError::io(&dir, e))?;
        let name = entry.file_name();
        if let Some((ManifestKind::Payload, algorithm)) =
            Manifest::parse_file_name(&name.to_string_lossy())
        {
            tracing::debug!(%algorithm, "found payload manifest");
            return Ok(());
        }
    }
    Err(BagError::MissingPayloadManifest { path: dir })
}

/// The payload directory must exist when any payload manifest lists files.
pub fn check_payload_directory_exists(bag: &Bag) -> BagResult<()> {
    if !bag.has_payload_entries() {
        return Ok(());
    }
    let dir = bag.payload_dir()?;
    if dir.is_dir() {
        Ok(())
    } else {
        Err(BagError::MissingPayloadDirectory { path: dir })
    }
}

/// Every fetch destination must be a safe path inside the payload area.
pub fn check_fetch_items_inside_payload(bag: &Bag, policy: &PathPolicy) -> BagResult<()> {
    for item in &bag.items_to_fetch {
        let safe = validate_manifest_path(&item.path, policy)?;
        let inside = if bag.version.uses_dot_bagit() {
            safe.components().next() != Some(DOT_BAGIT_DIR_NAME)
        } else {
            safe.starts_with_dir(PAYLOAD_DIR_NAME)
        };
        if !inside {
            return Err(BagError::FetchItemOutsidePayload {
                url: item.url.clone(),
                path: item.path.clone(),
            });
        }
    }
    Ok(())
}

/// Every fetch destination must be present on disk.
///
/// A bag with unresolved fetch items is holey: it can be structurally sound
/// but it cannot be complete.
pub fn check_fetch_items_resolved(bag: &Bag, policy: &PathPolicy) -> BagResult<()> {
    let root = bag.root("check_fetch_items_resolved")?;
    let mut unresolved = Vec::new();
    for item in &bag.items_to_fetch {
        let safe = validate_manifest_path(&item.path, policy)?;
        if locate(root, &safe).is_none() {
            unresolved.push(item.path.clone());
        }
    }
    if unresolved.is_empty() {
        Ok(())
    } else {
        Err(BagError::UnresolvedFetchItems { paths: unresolved })
    }
}

/// Run every structural check, cheapest first.
pub fn verify_structure(
    bag: &Bag,
    tolerate_missing_bagit_file: bool,
    policy: &PathPolicy,
) -> BagResult<()> {
    let root = bag.root("verify_structure")?;
    tracing::info!(root = %root.display(), "checking bag structure");
    check_fetch_items_inside_payload(bag, policy)?;
    check_bagit_file_exists(root, bag.version, tolerate_missing_bagit_file)?;
    check_at_least_one_payload_manifest(root, bag.version)?;
    check_payload_directory_exists(bag)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagit_core::FetchItem;
    use std::fs;

    fn bound_bag(root: &Path, version: Version) -> Bag {
        let mut bag = Bag::new(version);
        bag.root_dir = Some(root.to_path_buf());
        bag
    }

    #[test]
    fn bagit_file_location_depends_on_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bagit.txt"), "BagIt-Version: 0.97\n").unwrap();
        assert!(check_bagit_file_exists(dir.path(), Version::new(0, 97), false).is_ok());

        let err = check_bagit_file_exists(dir.path(), Version::new(2, 0), false).unwrap_err();
        assert!(matches!(err, BagError::MissingBagitFile { .. }));
        assert!(check_bagit_file_exists(dir.path(), Version::new(2, 0), true).is_ok());
    }

    #[test]
    fn payload_manifest_is_required() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tagmanifest-md5.txt"), "").unwrap();
        let err = check_at_least_one_payload_manifest(dir.path(), Version::new(1, 0)).unwrap_err();
        assert!(matches!(err, BagError::MissingPayloadManifest { .. }));

        fs::write(dir.path().join("manifest-sha256.txt"), "").unwrap();
        assert!(check_at_least_one_payload_manifest(dir.path(), Version::new(1, 0)).is_ok());
    }

    #[test]
    fn dot_bagit_manifests_live_in_control_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_at_least_one_payload_manifest(dir.path(), Version::new(2, 0)).unwrap_err();
        assert!(matches!(err, BagError::MissingPayloadManifest { .. }));

        fs::create_dir(dir.path().join(".bagit")).unwrap();
        fs::write(dir.path().join(".bagit/manifest-md5.txt"), "").unwrap();
        assert!(check_at_least_one_payload_manifest(dir.path(), Version::new(2, 0)).is_ok());
    }

    #[test]
    fn payload_dir_only_required_when_manifest_lists_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut bag = bound_bag(dir.path(), Version::new(0, 97));
        bag.set_payload_manifest(Manifest::new("md5"));
        assert!(check_payload_directory_exists(&bag).is_ok());

        let mut m = Manifest::new("md5");
        m.insert("data/a.txt", "00");
        bag.set_payload_manifest(m);
        let err = check_payload_directory_exists(&bag).unwrap_err();
        assert!(err.is_missing_structure());

        fs::create_dir(dir.path().join("data")).unwrap();
        assert!(check_payload_directory_exists(&bag).is_ok());
    }

    #[test]
    fn fetch_items_must_target_payload() {
        let policy = PathPolicy::default();
        let mut bag = Bag::new(Version::new(0, 97));
        bag.items_to_fetch
            .push(FetchItem::new("https://x/a", Some(1), "data/a"));
        assert!(check_fetch_items_inside_payload(&bag, &policy).is_ok());

        bag.items_to_fetch
            .push(FetchItem::new("https://x/b", None, "bag-info.txt"));
        let err = check_fetch_items_inside_payload(&bag, &policy).unwrap_err();
        assert!(matches!(err, BagError::FetchItemOutsidePayload { .. }));
    }

    #[test]
    fn fetch_items_are_path_validated_first() {
        let mut bag = Bag::new(Version::new(0, 97));
        bag.items_to_fetch
            .push(FetchItem::new("https://x/a", None, "data/../../etc/passwd"));
        let err = check_fetch_items_inside_payload(&bag, &PathPolicy::default()).unwrap_err();
        assert!(err.is_security());
    }

    #[test]
    fn dot_bagit_fetch_items_may_not_enter_control_dir() {
        let policy = PathPolicy::default();
        let mut bag = Bag::new(Version::new(2, 0));
        bag.items_to_fetch
            .push(FetchItem::new("https://x/a", None, "photos/a.jpg"));
        assert!(check_fetch_items_inside_payload(&bag, &policy).is_ok());

        bag.items_to_fetch
            .push(FetchItem::new("https://x/b", None, ".bagit/bag-info.txt"));
        assert!(check_fetch_items_inside_payload(&bag, &policy).is_err());
    }

    #[test]
    fn unresolved_fetch_items_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("data/here.bin"), b"x").unwrap();
        let mut bag = bound_bag(dir.path(), Version::new(0, 97));
        bag.items_to_fetch
            .push(FetchItem::new("https://x/here", Some(1), "data/here.bin"));
        assert!(check_fetch_items_resolved(&bag, &PathPolicy::default()).is_ok());

        bag.items_to_fetch
            .push(FetchItem::new("https://x/gone", None, "data/gone.bin"));
        match check_fetch_items_resolved(&bag, &PathPolicy::default()) {
            Err(BagError::UnresolvedFetchItems { paths }) => {
                assert_eq!(paths, vec!["data/gone.bin".to_string()])
            }
            other => panic!("expected UnresolvedFetchItems, got {other:?}"),
        }
    }

    #[test]
    fn verify_structure_requires_bound_bag() {
        let bag = Bag::new(Version::LATEST);
        let err = verify_structure(&bag, false, &PathPolicy::default()).unwrap_err();
        assert!(matches!(err, BagError::UnboundBag(_)));
    }
}
