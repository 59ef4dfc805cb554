//! # Quick Verification
//!
//! Compares the recorded `Payload-Oxum` against one walk of the payload
//! directory. File contents are never read, so this catches added,
//! removed and resized files but not same-size corruption.

use std::path::Path;

use bagit_core::{Bag, BagError, BagResult, OxumField, PayloadOxum, Version};

use crate::walk::walk_payload;

/// True when the bag records a well-formed Payload-Oxum and has nothing
/// left to fetch.
pub fn can_quick_verify(bag: &Bag) -> bool {
    let well_formed = bag
        .metadata
        .payload_oxum()
        .map(|raw| raw.parse::<PayloadOxum>().is_ok())
        .unwrap_or(false);
    well_formed && bag.items_to_fetch.is_empty()
}

/// Size and count of the payload files of a `version` bag rooted at `root`.
pub fn calculate_payload_oxum(
    root: &Path,
    version: Version,
    ignore_hidden: bool,
) -> BagResult<PayloadOxum> {
    let files = walk_payload(root, version, ignore_hidden)?;
    Ok(PayloadOxum {
        octets: files.iter().map(|f| f.len).sum(),
        files: files.len() as u64,
    })
}

/// Check the payload against the recorded Payload-Oxum.
///
/// Total size is compared before file count.
pub fn quick_verify(bag: &Bag, ignore_hidden: bool) -> BagResult<()> {
    let recorded: PayloadOxum = bag
        .metadata
        .payload_oxum()
        .ok_or(BagError::PayloadOxumAbsent { value: None })?
        .parse()?;

    let payload_dir = bag.payload_dir()?;
    let root = bag.root("quick_verify")?;
    let actual = calculate_payload_oxum(root, bag.version, ignore_hidden)?;
    tracing::info!(
        %recorded,
        calculated = %actual,
        payload_dir = %payload_dir.display(),
        "quick verify"
    );

    if recorded.octets != actual.octets {
        return Err(BagError::PayloadOxumMismatch {
            field: OxumField::Octets,
            expected: recorded.octets,
            actual: actual.octets,
        });
    }
    if recorded.files != actual.files {
        return Err(BagError::PayloadOxumMismatch {
            field: OxumField::Files,
            expected: recorded.files,
            actual: actual.files,
        });
    }
    Ok(())
}
