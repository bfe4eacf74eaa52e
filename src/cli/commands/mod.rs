//! CLI command implementations

pub mod changes;
pub mod clean;
pub mod clear;
pub mod config;
pub mod env;
pub mod install_cmd;
pub mod key;
pub mod list;
pub mod restore;
pub mod save;

pub use changes::execute as changes;
pub use clean::execute as clean;
pub use clear::execute as clear;
pub use config::execute as config;
pub use env::execute as env;
pub use install_cmd::execute as install_cmd;
pub use key::execute as key;
pub use list::execute as list;
pub use restore::execute as restore;
pub use save::execute as save;

use crate::config::Config;
use crate::error::{HoardError, HoardResult};
use crate::manager::CacheManager;
use crate::workspace::Workspace;
use std::path::PathBuf;

fn current_dir() -> HoardResult<PathBuf> {
    std::env::current_dir().map_err(|e| HoardError::io("getting current directory", e))
}

/// Build the cache manager for the loaded configuration
pub(crate) fn cache_manager(config: &Config) -> HoardResult<CacheManager> {
    Ok(CacheManager::from_config(config, &current_dir()?))
}

/// Resolve a workspace argument, defaulting to the current directory
pub(crate) fn target_workspace(
    manager: &CacheManager,
    workspace: Option<&str>,
) -> HoardResult<Workspace> {
    match workspace {
        Some(name) => manager.resolve_workspace(name),
        None => {
            let cwd = current_dir()?;
            manager.resolve_workspace(&cwd.to_string_lossy())
        }
    }
}
