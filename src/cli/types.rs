//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::catalog::CatalogArgs;
use super::commands::run::RunArgs;
use super::commands::verify::VerifyArgs;

#[derive(Parser, Debug)]
#[command(name = "udp-qa-agent")]
#[command(about = "Generate and refine UDP mock listeners and test scripts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (replaces the project `.udp-qa/` files)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Identify services in QA notes, then generate and refine a mock/test pair for each
    Run(RunArgs),

    /// Parse a service catalog without contacting the backend
    Catalog(CatalogArgs),

    /// Run an existing test script against an existing mock once
    Verify(VerifyArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "udp-qa-agent",
            "run",
            "--notes",
            "notes.md",
            "-r",
            "2",
            "--json",
            "--config",
            "qa.yaml",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("qa.yaml")));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.notes, PathBuf::from("notes.md"));
                assert_eq!(args.retry_budget, Some(2));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verify_requires_both_scripts() {
        assert!(Cli::try_parse_from(["udp-qa-agent", "verify", "--mock", "m.py"]).is_err());
    }
}
