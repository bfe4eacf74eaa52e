//! Key command - print a workspace's cache key

use crate::cli::args::{KeyArgs, OutputFormat};
use crate::cli::commands::{cache_manager, target_workspace};
use crate::config::Config;
use crate::error::HoardResult;
use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyJson {
    workspace: String,
    key: String,
    cached: bool,
    lockfile: Option<String>,
    package_manager: Option<String>,
    runtime_version: Option<String>,
    dependency_hash: Option<String>,
    config_hashes: BTreeMap<&'static str, String>,
}

/// Execute the key command
pub async fn execute(args: KeyArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;
    let workspace = target_workspace(&manager, args.workspace.as_deref())?;
    let inputs = manager.key_inputs(&workspace.path);
    let key = inputs.key();

    match args.format {
        OutputFormat::Plain => println!("{}", key),
        OutputFormat::Json => {
            let json = KeyJson {
                workspace: manager.settings().workspace_label(&workspace.path),
                cached: manager.entry(&key).is_some(),
                key: key.to_string(),
                lockfile: inputs
                    .lockfile
                    .as_ref()
                    .map(|l| l.path.display().to_string()),
                package_manager: inputs.lockfile.as_ref().map(|l| l.manager.to_string()),
                runtime_version: inputs.runtime_version.clone(),
                dependency_hash: inputs.dependency_hash.clone(),
                config_hashes: inputs.config_hashes.iter().cloned().collect(),
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            let none = || style("-").dim().to_string();
            println!("{:<16} {}", style("Workspace").bold(), workspace.path.display());
            println!("{:<16} {}", style("Key").bold(), style(&key).cyan());
            println!(
                "{:<16} {}",
                style("Lockfile").bold(),
                inputs
                    .lockfile
                    .as_ref()
                    .map(|l| format!("{} ({})", l.path.display(), l.hash))
                    .unwrap_or_else(none)
            );
            println!(
                "{:<16} {}",
                style("Runtime").bold(),
                inputs.runtime_version.clone().unwrap_or_else(none)
            );
            println!(
                "{:<16} {}",
                style("Dependencies").bold(),
                inputs.dependency_hash.clone().unwrap_or_else(none)
            );
            for (name, hash) in &inputs.config_hashes {
                println!("{:<16} {} ({})", style("Config").bold(), name, hash);
            }
        }
    }

    Ok(())
}
