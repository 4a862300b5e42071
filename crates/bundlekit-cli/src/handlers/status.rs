//! `status` command handler.

use crate::bootstrap::CliContext;
use crate::presentation::format_bytes;

/// Print the data directory, feature state, catalogs and residency.
pub async fn execute(ctx: &CliContext) {
    let manager = ctx.manager();
    println!("data_root = {}", ctx.data_root.display());
    println!("package_base_url = {}", manager.config().package_base_url);
    println!(
        "catalog_base_url = {}",
        manager
            .config()
            .catalog_base_url
            .as_ref()
            .map_or_else(|| "(unset)".to_string(), ToString::to_string)
    );
    println!("state = {}", manager.state());
    println!();

    for catalog in manager.catalogs() {
        println!("catalog {} {}", catalog.identity(), catalog.version());
    }

    let not_cached = manager.not_cached_package_names().await;
    let visible: Vec<String> = manager
        .catalogs()
        .iter()
        .flat_map(|c| c.package_names().map(str::to_string).collect::<Vec<_>>())
        .collect();
    let cached: Vec<&String> = visible.iter().filter(|n| !not_cached.contains(*n)).collect();
    println!(
        "cached = {}/{} package(s), {}",
        cached.len(),
        visible.len(),
        format_bytes(manager.packages_weight(&cached))
    );
    if !not_cached.is_empty() {
        println!("not cached = {}", not_cached.join(", "));
    }
}
