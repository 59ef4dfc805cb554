//! # bagit CLI entry point
//!
//! Parses command-line arguments, sets up logging and dispatches to the
//! subcommand handlers in the library crate.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bagit_cli::create::{run_create, CreateArgs};
use bagit_cli::load_config;
use bagit_cli::verify::{run_verify, VerifyArgs};
use bagit_cli::write::{run_write, WriteArgs};

/// BagIt toolkit.
///
/// Verifies, rewrites and creates BagIt bags. Exit status is 0 on success
/// and 1 on any failure.
#[derive(Parser, Debug)]
#[command(name = "bagit", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a bag for completeness and validity.
    Verify(VerifyArgs),

    /// Write an existing bag to a new location.
    Write(WriteArgs),

    /// Turn a directory into a bag in place.
    Create(CreateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Verify(args) => run_verify(args, config),
        Commands::Write(args) => run_write(args, config),
        Commands::Create(args) => run_create(args, config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_verify_defaults() {
        let cli = Cli::try_parse_from(["bagit", "verify", "bag"]).unwrap();
        assert_eq!(cli.verbose, 0);
        if let Commands::Verify(args) = cli.command {
            assert_eq!(args.dir, PathBuf::from("bag"));
            assert!(!args.quick);
            assert!(!args.complete);
            assert!(!args.json);
            assert!(args.workers.is_none());
        } else {
            panic!("expected verify");
        }
    }

    #[test]
    fn cli_parse_verify_flags() {
        let cli = Cli::try_parse_from([
            "bagit",
            "-vv",
            "--config",
            "bagit.yaml",
            "verify",
            "bag",
            "--json",
            "--workers",
            "4",
            "--ignore-hidden",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("bagit.yaml")));
        if let Commands::Verify(args) = cli.command {
            assert!(args.json);
            assert!(args.ignore_hidden);
            assert_eq!(args.workers, Some(4));
        } else {
            panic!("expected verify");
        }
    }

    #[test]
    fn cli_parse_quick_conflicts_with_complete() {
        assert!(Cli::try_parse_from(["bagit", "verify", "bag", "--quick", "--complete"]).is_err());
    }

    #[test]
    fn cli_parse_write() {
        let cli = Cli::try_parse_from(["bagit", "write", "src", "dest"]).unwrap();
        if let Commands::Write(args) = cli.command {
            assert_eq!(args.src, PathBuf::from("src"));
            assert_eq!(args.dest, PathBuf::from("dest"));
        } else {
            panic!("expected write");
        }
    }

    #[test]
    fn cli_parse_create_repeated_algorithms() {
        let cli = Cli::try_parse_from([
            "bagit",
            "create",
            "dir",
            "--algorithm",
            "md5",
            "--algorithm",
            "sha256",
            "--version",
            "2.0",
        ])
        .unwrap();
        if let Commands::Create(args) = cli.command {
            assert_eq!(args.algorithms, vec!["md5".to_string(), "sha256".to_string()]);
            assert_eq!(args.version, "2.0");
            assert!(!args.include_hidden);
        } else {
            panic!("expected create");
        }
    }

    #[test]
    fn cli_parse_create_defaults() {
        let cli = Cli::try_parse_from(["bagit", "create", "dir"]).unwrap();
        if let Commands::Create(args) = cli.command {
            assert_eq!(args.algorithms, vec!["sha512".to_string()]);
            assert_eq!(args.version, "1.0");
        } else {
            panic!("expected create");
        }
    }

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["bagit"]).is_err());
    }
}
