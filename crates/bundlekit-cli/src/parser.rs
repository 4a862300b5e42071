//! Root CLI parser and global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Fetch, cache and load versioned content packages.
#[derive(Parser)]
#[command(name = "bundlekit")]
#[command(about = "Fetch, cache and load versioned content packages")]
#[command(version)]
pub struct Cli {
    /// Override the data directory for this invocation
    #[arg(long = "data-dir", global = true, env = "BUNDLEKIT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Override the package base URL
    #[arg(long = "base-url", global = true, env = "BUNDLEKIT_BASE_URL")]
    pub base_url: Option<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CatalogCommand, Commands};
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "bundlekit",
            "--verbose",
            "--data-dir",
            "/tmp/bundles",
            "catalog",
            "list",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/bundles")));
        assert!(matches!(
            cli.command,
            Some(Commands::Catalog {
                command: CatalogCommand::List
            })
        ));
    }

    #[test]
    fn test_preload_args() {
        let cli = Cli::parse_from(["bundlekit", "preload", "ui", "audio", "--parallel", "3", "--yes"]);
        let Some(Commands::Preload {
            names,
            list,
            parallel,
            yes,
        }) = cli.command
        else {
            panic!("expected preload");
        };
        assert_eq!(names, vec!["ui", "audio"]);
        assert!(list.is_none());
        assert_eq!(parallel, Some(3));
        assert!(yes);
    }

    #[test]
    fn test_preload_needs_names_or_list() {
        assert!(Cli::try_parse_from(["bundlekit", "preload"]).is_err());
        assert!(Cli::try_parse_from(["bundlekit", "preload", "--list", "intro.json"]).is_ok());
    }
}
