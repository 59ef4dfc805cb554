//! # Create Subcommand
//!
//! ```bash
//! bagit create ./incoming
//! bagit create ./incoming --algorithm md5 --algorithm sha256 --version 2.0
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use bagit_core::Version;
use bagit_io::{create_bag_in_place, BagWriter, CreateOptions};
use bagit_verify::VerifierConfig;

/// Arguments for `bagit create`.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Directory to turn into a bag.
    pub dir: PathBuf,

    /// Manifest algorithm. Repeat for several manifests.
    #[arg(long = "algorithm", default_value = "sha512")]
    pub algorithms: Vec<String>,

    /// BagIt version to write, e.g. 0.97, 1.0 or 2.0.
    #[arg(long, default_value = "1.0")]
    pub version: String,

    /// Include hidden files and directories in the payload. Without it,
    /// hidden files that would land inside the payload are refused.
    #[arg(long)]
    pub include_hidden: bool,
}

/// Execute `bagit create`.
pub fn run_create(args: &CreateArgs, config: VerifierConfig) -> Result<u8> {
    let options = CreateOptions {
        version: Version::parse(&args.version)?,
        algorithms: args.algorithms.clone(),
        include_hidden: args.include_hidden,
    };
    let bag = create_bag_in_place(&args.dir, &options, &BagWriter::from_config(&config))
        .with_context(|| format!("creating bag in {}", args.dir.display()))?;
    println!(
        "created BagIt {} bag in {} ({} payload file(s))",
        bag.version,
        args.dir.display(),
        bag.payload_manifests.first().map_or(0, |m| m.len())
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bagit_io::BagReader;
    use bagit_verify::BagVerifier;
    use std::fs;

    #[test]
    fn creates_a_verifiable_bag() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("report.csv"), "a,b\n1,2\n").unwrap();
        let args = CreateArgs {
            dir: dir.path().to_path_buf(),
            algorithms: vec!["sha256".into()],
            version: "1.0".into(),
            include_hidden: false,
        };
        assert_eq!(run_create(&args, VerifierConfig::default()).unwrap(), 0);
        assert!(dir.path().join("data/report.csv").is_file());
        let bag = BagReader::read(dir.path()).unwrap();
        BagVerifier::default().is_valid(&bag).unwrap();
    }

    #[test]
    fn nested_hidden_file_needs_include_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("photos")).unwrap();
        fs::write(dir.path().join("photos/a.jpg"), "jpeg").unwrap();
        fs::write(dir.path().join("photos/.DS_Store"), "junk").unwrap();
        let mut args = CreateArgs {
            dir: dir.path().to_path_buf(),
            algorithms: vec!["md5".into()],
            version: "1.0".into(),
            include_hidden: false,
        };
        assert!(run_create(&args, VerifierConfig::default()).is_err());
        assert!(!dir.path().join("data").exists());

        args.include_hidden = true;
        assert_eq!(run_create(&args, VerifierConfig::default()).unwrap(), 0);
        let bag = BagReader::read(dir.path()).unwrap();
        BagVerifier::default().is_valid(&bag).unwrap();
    }

    #[test]
    fn bad_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let args = CreateArgs {
            dir: dir.path().to_path_buf(),
            algorithms: vec!["md5".into()],
            version: "one".into(),
            include_hidden: false,
        };
        assert!(run_create(&args, VerifierConfig::default()).is_err());
    }
}
