//! Subcommands.

use std::path::PathBuf;

use clap::Subcommand;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Manage catalogs
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },

    /// Load one asset and print it
    Load {
        /// Asset name
        asset: String,
        /// Timeout in seconds for the whole dependency tree (0 = none)
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Write the asset to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download packages into the cache ahead of use
    Preload {
        /// Package names
        #[arg(required_unless_present = "list")]
        names: Vec<String>,
        /// Preload list, relative to the preload list base URL, or an absolute URL
        #[arg(short, long, conflicts_with = "names")]
        list: Option<String>,
        /// Maximum concurrent downloads
        #[arg(short, long)]
        parallel: Option<usize>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show catalogs, residency and cache state
    Status,

    /// Manage the package cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Discard every catalog and clear the cache
    Reset,
}

/// Catalog subcommands.
#[derive(Subcommand)]
pub enum CatalogCommand {
    /// Fetch a catalog from a URL and apply it as an update
    Fetch {
        /// Catalog manifest URL
        url: String,
    },
    /// Download registered catalogs, or check installed ones for updates
    Sync,
    /// List installed catalogs
    List,
    /// Delete an installed catalog
    Discard {
        /// Catalog identity
        identity: String,
    },
}

/// Cache subcommands.
#[derive(Subcommand)]
pub enum CacheCommand {
    /// Unload everything and delete every cached package
    Clear,
}
