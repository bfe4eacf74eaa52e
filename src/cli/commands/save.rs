//! Save command - store a workspace's artifacts

use crate::cache::{format_bytes, SaveOutcome};
use crate::cli::args::WorkspaceArgs;
use crate::cli::commands::{cache_manager, target_workspace};
use crate::config::Config;
use crate::error::HoardResult;
use console::style;

/// Execute the save command
///
/// Contention and copy failures are reported but are not errors.
pub async fn execute(args: WorkspaceArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;
    let workspace = target_workspace(&manager, args.workspace.as_deref())?;

    match manager.save_workspace_cache(&workspace.path) {
        SaveOutcome::Saved {
            key,
            artifacts,
            size,
        } => println!(
            "{} Saved {} to {} ({}, {})",
            style("✓").green(),
            workspace.id,
            style(&key).cyan(),
            artifacts.join(", "),
            format_bytes(size)
        ),
        SaveOutcome::Contended { key } => println!(
            "{} {} is being written by another process, skipped",
            style("~").yellow(),
            key
        ),
        SaveOutcome::NothingToSave { key } => println!(
            "{} No artifacts to save for {} ({})",
            style("○").dim(),
            workspace.id,
            key
        ),
        SaveOutcome::Disabled { .. } => println!(
            "{} Cache disabled (cache.enabled = false)",
            style("○").dim()
        ),
        SaveOutcome::Failed { key, reason } => println!(
            "{} Failed to save {}: {}",
            style("!").yellow(),
            key,
            reason
        ),
    }

    Ok(())
}
