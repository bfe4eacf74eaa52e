//! Restore command - copy cached artifacts into a workspace

use crate::cli::args::WorkspaceArgs;
use crate::cli::commands::{cache_manager, target_workspace};
use crate::config::Config;
use crate::error::HoardResult;
use console::style;

/// Execute the restore command
///
/// A miss is reported but is not an error.
pub async fn execute(args: WorkspaceArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;
    let workspace = target_workspace(&manager, args.workspace.as_deref())?;

    if !manager.is_enabled() {
        println!("{} Cache disabled (cache.enabled = false)", style("○").dim());
        return Ok(());
    }

    let report = manager.restore_report(&workspace.path);

    if report.is_hit() {
        println!(
            "{} Restored {} from {} ({})",
            style("✓").green(),
            workspace.id,
            style(&report.key).cyan(),
            report.restored.join(", ")
        );
    } else {
        println!(
            "{} Cache miss for {} ({})",
            style("○").dim(),
            workspace.id,
            report.key
        );
    }

    Ok(())
}
