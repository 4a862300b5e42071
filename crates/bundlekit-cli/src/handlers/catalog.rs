//! `catalog` subcommands.

use url::Url;

use bundlekit_loader::{CatalogDownload, UpdateOutcome};

use crate::bootstrap::CliContext;
use crate::commands::CatalogCommand;
use crate::error::CliError;
use crate::presentation::{format_bytes, print_separator, truncate_string};

/// Dispatch a catalog subcommand.
pub async fn execute(ctx: &CliContext, command: CatalogCommand) -> Result<(), CliError> {
    match command {
        CatalogCommand::Fetch { url } => fetch(ctx, &url).await,
        CatalogCommand::Sync => sync(ctx).await,
        CatalogCommand::List => {
            list(ctx);
            Ok(())
        }
        CatalogCommand::Discard { identity } => discard(ctx, &identity).await,
    }
}

async fn fetch(ctx: &CliContext, url: &str) -> Result<(), CliError> {
    let url = Url::parse(url).map_err(|e| CliError::Arguments(format!("{url}: {e}")))?;
    let outcome = ctx.manager().fetch_catalog(url).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn sync(ctx: &CliContext) -> Result<(), CliError> {
    match ctx.manager().download_catalogs_if_needed().await? {
        CatalogDownload::Downloaded(identities) => {
            for identity in identities {
                println!("Downloaded catalog '{identity}'");
            }
            Ok(())
        }
        CatalogDownload::AlreadyDownloading => {
            println!("A catalog download is already in progress");
            Ok(())
        }
        CatalogDownload::AlreadyDownloaded => check_for_updates(ctx).await,
    }
}

async fn check_for_updates(ctx: &CliContext) -> Result<(), CliError> {
    let Some(base) = ctx.manager().config().catalog_base_url.clone() else {
        println!("No catalog_base_url configured; installed catalogs are left as they are");
        return Ok(());
    };
    for catalog in ctx.manager().catalogs() {
        let url = base
            .join(&format!("{}.json", catalog.identity()))
            .map_err(|e| CliError::Config(e.to_string()))?;
        let outcome = ctx.manager().fetch_catalog(url).await?;
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::Installed { identity, version } => {
            println!("Installed catalog '{identity}' {version}");
        }
        UpdateOutcome::AlreadyUpdated(c) => {
            println!("Catalog '{}' is up to date ({})", c.identity, c.current_version);
        }
        UpdateOutcome::Committed(c) => {
            println!(
                "Updated catalog '{}' {} -> {} ({} package(s) changed)",
                c.identity,
                c.current_version,
                c.incoming_version,
                c.changed.len()
            );
            if !c.changed_in_use.is_empty() {
                println!("  In use, refreshed on next load: {}", c.changed_in_use.join(", "));
            }
        }
        UpdateOutcome::Declined(c) => {
            println!(
                "Update of '{}' to {} declined; {} stays active",
                c.identity, c.incoming_version, c.current_version
            );
        }
    }
}

fn list(ctx: &CliContext) {
    let catalogs = ctx.manager().catalogs();
    if catalogs.is_empty() {
        println!("No catalogs installed. Run `bundlekit catalog sync`.");
        return;
    }
    println!("{:<24} {:<16} {:>8} {:>12}", "IDENTITY", "VERSION", "PACKAGES", "SIZE");
    print_separator(63);
    for catalog in catalogs {
        let names: Vec<&str> = catalog.package_names().collect();
        println!(
            "{:<24} {:<16} {:>8} {:>12}",
            truncate_string(catalog.identity(), 24),
            truncate_string(catalog.version(), 16),
            names.len(),
            format_bytes(catalog.total_size(&names)),
        );
    }
}

async fn discard(ctx: &CliContext, identity: &str) -> Result<(), CliError> {
    if ctx.manager().discard_catalog(identity).await {
        println!("Discarded catalog '{identity}'");
        Ok(())
    } else {
        Err(CliError::Catalog(format!("no stored catalog '{identity}'")))
    }
}
