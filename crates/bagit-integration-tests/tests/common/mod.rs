//! Shared on-disk bag fixtures.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use bagit_core::{Bag, Manifest, Version};
use bagit_crypto::{hash_bytes, AlgorithmRegistry};
use bagit_io::BagReader;
use digest::DynDigest;

pub fn md5_hex(data: &[u8]) -> String {
    let factory = AlgorithmRegistry::standard().lookup("md5").unwrap();
    hash_bytes(data, factory)
}

/// Write a 0.97 bag with an MD5 payload manifest, `bagit.txt` and a
/// bag-info carrying the correct Payload-Oxum, then read it back.
pub fn write_md5_bag(root: &Path, files: &[(&str, &[u8])]) -> Bag {
    fs::create_dir_all(root.join("data")).unwrap();
    let mut manifest = String::new();
    let mut octets = 0usize;
    for (name, contents) in files {
        let path = root.join("data").join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        manifest.push_str(&format!("{}  data/{}\n", md5_hex(contents), name));
        octets += contents.len();
    }
    fs::write(
        root.join("bagit.txt"),
        "BagIt-Version: 0.97\nTag-File-Character-Encoding: UTF-8\n",
    )
    .unwrap();
    fs::write(root.join("manifest-md5.txt"), manifest).unwrap();
    fs::write(
        root.join("bag-info.txt"),
        format!("Payload-Oxum: {}.{}\n", octets, files.len()),
    )
    .unwrap();
    BagReader::read(root).unwrap()
}

/// An in-memory bag of the given version with payload on disk and an MD5
/// payload manifest, not yet written.
pub fn unwritten_bag(root: &Path, version: Version, files: &[(&str, &[u8])]) -> Bag {
    let payload = bagit_core::payload_dir_for(version, root);
    let mut manifest = Manifest::new("md5");
    for (name, contents) in files {
        let path = payload.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        manifest.insert(format!("{}{}", version.payload_prefix(), name), &md5_hex(contents));
    }
    let mut bag = Bag::new(version);
    bag.set_payload_manifest(manifest);
    bag.root_dir = Some(root.to_path_buf());
    bag
}

static MD5_CALLS: AtomicUsize = AtomicUsize::new(0);

fn counting_md5() -> Box<dyn DynDigest + Send> {
    MD5_CALLS.fetch_add(1, Ordering::SeqCst);
    let inner = AlgorithmRegistry::standard().lookup("md5").unwrap();
    inner()
}

/// Registry whose `md5` counts how often a digest is created.
///
/// Only tests that expect no hashing at all should use it, since the counter
/// is shared by every test in the binary.
pub fn counting_registry() -> AlgorithmRegistry {
    let mut registry = AlgorithmRegistry::empty();
    registry.register("md5", counting_md5);
    registry
}

pub fn md5_digests_created() -> usize {
    MD5_CALLS.load(Ordering::SeqCst)
}
