//! CLI entry point: the composition root.
//!
//! Parses arguments, installs logging, bootstraps the `CliContext` and
//! dispatches to a handler.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use bundlekit_cli::handlers::preload::PreloadArgs;
use bundlekit_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let ctx = bootstrap(CliConfig {
        data_dir: cli.data_dir,
        base_url: cli.base_url,
    })
    .await?;

    match command {
        Commands::Catalog { command } => handlers::catalog::execute(&ctx, command).await?,
        Commands::Load {
            asset,
            timeout,
            output,
        } => handlers::load::execute(&ctx, &asset, timeout, output.as_deref()).await?,
        Commands::Preload {
            names,
            list,
            parallel,
            yes,
        } => {
            let args = PreloadArgs {
                names,
                list,
                parallel,
                yes,
            };
            handlers::preload::execute(&ctx, args).await?;
        }
        Commands::Status => handlers::status::execute(&ctx).await,
        Commands::Cache { command } => handlers::cache::execute(&ctx, command).await?,
        Commands::Reset => handlers::cache::reset(&ctx).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
