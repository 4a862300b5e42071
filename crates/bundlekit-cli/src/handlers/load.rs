//! `load` command handler.

use std::path::Path;
use std::time::Duration;

use bundlekit_core::Asset;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::format_bytes;

/// Load `asset` and print it, or write it to `output`.
pub async fn execute(
    ctx: &CliContext,
    asset: &str,
    timeout_secs: Option<u64>,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let manager = ctx.manager();
    let loaded = match timeout_secs {
        Some(0) => manager.load_asset_with_timeout(asset, None).await?,
        Some(secs) => {
            manager
                .load_asset_with_timeout(asset, Some(Duration::from_secs(secs)))
                .await?
        }
        None => manager.load_asset(asset).await?,
    };

    // Package responses may announce newer catalogs
    for result in manager.apply_version_signals().await {
        match result {
            Ok(outcome) => tracing::info!(?outcome, "Applied announced catalog"),
            Err(e) => tracing::warn!(error = %e, "Announced catalog update failed"),
        }
    }

    if let Some(path) = output {
        std::fs::write(path, asset_bytes(&loaded))?;
        println!("Wrote '{asset}' to {}", path.display());
        return Ok(());
    }

    match loaded {
        Asset::Text(text) => println!("{text}"),
        Asset::Json(value) => println!(
            "{}",
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
        ),
        Asset::Binary(bytes) => println!(
            "<binary, {}>; use --output to save it",
            format_bytes(bytes.len() as u64)
        ),
    }
    Ok(())
}

fn asset_bytes(asset: &Asset) -> Vec<u8> {
    match asset {
        Asset::Text(text) => text.as_bytes().to_vec(),
        Asset::Json(value) => value.to_string().into_bytes(),
        Asset::Binary(bytes) => bytes.to_vec(),
    }
}
