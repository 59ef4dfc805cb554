//! # Verify Subcommand
//!
//! ```bash
//! bagit verify ./my-bag              # full validation
//! bagit verify ./my-bag --complete   # existence and listing only
//! bagit verify ./my-bag --quick      # Payload-Oxum only
//! ```

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::Args;

use bagit_io::BagReader;
use bagit_verify::{BagVerifier, VerifierConfig};

/// Arguments for `bagit verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Root directory of the bag.
    pub dir: PathBuf,

    /// Only compare the Payload-Oxum against the payload directory.
    #[arg(long, conflicts_with = "complete")]
    pub quick: bool,

    /// Check completeness without hashing.
    #[arg(long)]
    pub complete: bool,

    /// Skip hidden payload files.
    #[arg(long)]
    pub ignore_hidden: bool,

    /// Worker threads for hashing (0 = one per core).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Print the full verification report as JSON.
    #[arg(long, conflicts_with = "quick")]
    pub json: bool,
}

/// Execute `bagit verify`.
pub fn run_verify(args: &VerifyArgs, mut config: VerifierConfig) -> Result<u8> {
    if args.ignore_hidden {
        config.ignore_hidden_files = true;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let bag = if config.tolerate_missing_bagit_file {
        BagReader::read_tolerating_missing_declaration(&args.dir)
    } else {
        BagReader::read(&args.dir)
    }
    .with_context(|| format!("reading bag at {}", args.dir.display()))?;
    let verifier = BagVerifier::new(config);

    if args.quick {
        verifier.quick_verify(&bag)?;
        println!("{}: payload oxum matches", args.dir.display());
        return Ok(0);
    }
    if args.complete {
        verifier.is_complete(&bag)?;
        println!("{}: complete", args.dir.display());
        return Ok(0);
    }

    let report = verifier.report(&bag, &AtomicBool::new(false))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    tracing::info!(
        files = report.files_declared,
        checksums = report.checksums_compared,
        "verification finished"
    );
    report.into_result()?;
    if !args.json {
        println!("{}: valid", args.dir.display());
    }
    Ok(0)
}
