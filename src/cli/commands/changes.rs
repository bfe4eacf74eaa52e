//! Changes command - list workspaces changed since a baseline

use crate::cli::args::{ChangesArgs, OutputFormat};
use crate::cli::commands::cache_manager;
use crate::config::Config;
use crate::error::HoardResult;
use console::style;

/// Execute the changes command
pub async fn execute(args: ChangesArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;
    let base_ref = args.base.as_deref().unwrap_or(&config.changes.base_ref);
    let changes = manager.detect_changes(base_ref).await;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&changes)?),
        OutputFormat::Plain => {
            // One workspace per line: everything known when a full rebuild is needed.
            let all: Vec<String> = manager.workspaces().into_iter().map(|ws| ws.id).collect();
            if changes.requires_full_rebuild {
                for id in changes.affected(&all) {
                    println!("{}", id);
                }
            } else {
                for id in &changes.changed_workspaces {
                    println!("{}", id);
                }
            }
        }
        OutputFormat::Table => {
            println!("Changes since {}", style(base_ref).cyan());
            println!();

            if changes.requires_full_rebuild {
                println!(
                    "  {} Full rebuild required (root config, lockfile or diff failure)",
                    style("!").yellow()
                );
            }

            if changes.changed_workspaces.is_empty() {
                if !changes.requires_full_rebuild {
                    println!("  No workspaces changed.");
                }
            } else {
                for id in &changes.changed_workspaces {
                    println!("  {} {}", style("•").cyan(), id);
                }
            }

            println!();
            println!("Files changed: {}", changes.changed_files.len());
        }
    }

    Ok(())
}
