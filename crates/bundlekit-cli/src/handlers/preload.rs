//! `preload` command handler.

use url::Url;

use bundlekit_loader::PreloadRequest;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::PreloadProgress;

/// Preload command arguments.
pub struct PreloadArgs {
    pub names: Vec<String>,
    pub list: Option<String>,
    pub parallel: Option<usize>,
    pub yes: bool,
}

/// Resolve `--list` against the preload list base URL unless it is absolute.
fn list_url(ctx: &CliContext, list: &str) -> Result<Url, CliError> {
    if let Ok(url) = Url::parse(list) {
        return Ok(url);
    }
    ctx.manager().preload_list_url(list).ok_or_else(|| {
        CliError::Config(format!(
            "'{list}' is not a URL and preload_list_base_url is not configured"
        ))
    })
}

/// Execute the preload command.
pub async fn execute(ctx: &CliContext, args: PreloadArgs) -> Result<(), CliError> {
    let config = ctx.manager().config();
    let request = match &args.list {
        Some(list) => PreloadRequest::list(list_url(ctx, list)?),
        None => PreloadRequest::names(args.names),
    }
    .with_max_parallel(args.parallel.unwrap_or(config.max_parallel_preloads))
    .with_timeout(config.timeout);

    let observer = PreloadProgress::new(args.yes);
    let report = ctx.manager().preload_with(request, &observer).await?;

    if report.cancelled {
        println!("Preload cancelled");
        return Ok(());
    }
    for name in &report.unknown {
        println!("  {name}: not in any catalog");
    }
    println!(
        "Preloaded {} package(s), {} failed",
        report.downloaded.len(),
        report.failed.len()
    );
    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(CliError::Network(format!(
            "{} package(s) failed to preload",
            report.failed.len()
        )))
    }
}
