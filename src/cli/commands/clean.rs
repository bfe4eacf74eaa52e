//! Clean command - evict expired cache entries

use crate::cache::{format_bytes, ttl_from_days};
use crate::cli::args::CleanArgs;
use crate::cli::commands::cache_manager;
use crate::config::Config;
use crate::error::HoardResult;
use console::style;
use std::path::Path;

/// Execute the clean command
pub async fn execute(args: CleanArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;
    let days = args.days.unwrap_or(config.cache.ttl_days);

    if days == 0 {
        println!("Cache eviction is disabled (ttl_days = 0)");
        return Ok(());
    }

    let report = manager
        .sweeper()
        .with_ttl(ttl_from_days(days))
        .with_dry_run(args.dry_run)
        .cleanup_expired();

    for error in &report.errors {
        println!("  {} {}", style("!").yellow(), error);
    }

    for path in &report.stale_markers {
        println!(
            "  {} {} (left by an interrupted save)",
            style("•").yellow(),
            file_name(path)
        );
    }

    if report.removed.is_empty() {
        println!("No cache entries older than {} days.", days);
        return Ok(());
    }

    for path in &report.removed {
        println!("  {} {}", style("•").red(), file_name(path));
    }
    println!();

    if args.dry_run {
        println!(
            "Dry run - would remove {} item(s), {}.",
            report.removed.len(),
            format_bytes(report.bytes_reclaimed)
        );
    } else {
        println!(
            "{} removed {} item(s), reclaimed {}",
            style("✓").green(),
            report.removed.len(),
            format_bytes(report.bytes_reclaimed)
        );
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
