//! `cache` and `reset` command handlers.

use crate::bootstrap::CliContext;
use crate::commands::CacheCommand;
use crate::error::CliError;

/// Dispatch a cache subcommand.
pub async fn execute(ctx: &CliContext, command: CacheCommand) -> Result<(), CliError> {
    match command {
        CacheCommand::Clear => {
            ctx.manager().clean_cached_packages().await?;
            println!("Cache cleared");
        }
    }
    Ok(())
}

/// Discard every catalog and clear the cache.
pub async fn reset(ctx: &CliContext) -> Result<(), CliError> {
    let count = ctx.manager().catalogs().len();
    ctx.manager().factory_reset().await?;
    println!("Discarded {count} catalog(s) and cleared the cache");
    Ok(())
}
