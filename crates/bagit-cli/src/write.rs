//! # Write Subcommand
//!
//! Reads a bag and writes it to a new location, recomputing Payload-Oxum and
//! the tag manifests on the way.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use bagit_io::{BagReader, BagWriter};
use bagit_verify::VerifierConfig;

/// Arguments for `bagit write`.
#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Root directory of the existing bag.
    pub src: PathBuf,

    /// Destination directory. Created if missing.
    pub dest: PathBuf,
}

/// Execute `bagit write`.
pub fn run_write(args: &WriteArgs, config: VerifierConfig) -> Result<u8> {
    let mut bag = BagReader::read(&args.src)
        .with_context(|| format!("reading bag at {}", args.src.display()))?;
    BagWriter::from_config(&config)
        .write(&mut bag, &args.dest)
        .with_context(|| format!("writing bag to {}", args.dest.display()))?;
    println!(
        "{} -> {} (Payload-Oxum {})",
        args.src.display(),
        args.dest.display(),
        bag.metadata.payload_oxum().unwrap_or("-")
    );
    Ok(0)
}
