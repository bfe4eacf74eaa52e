//! Configuration schema for hoard
//!
//! Global configuration lives at `~/.config/hoard/config.toml`; a project
//! `.hoard.toml` overrides it key by key.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Monorepo layout
    pub workspace: WorkspaceConfig,

    /// Artifact cache settings
    pub cache: CacheConfig,

    /// Change detection settings
    pub changes: ChangesConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Monorepo layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Monorepo root (defaults to the directory holding `.hoard.toml`,
    /// or the current directory)
    pub root: Option<PathBuf>,

    /// Directories under the root that hold one workspace per subdirectory
    pub containers: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            containers: vec!["workspaces".to_string()],
        }
    }
}

/// How artifact directories are copied in and out of the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopierKind {
    /// In-process recursive copy
    #[default]
    Native,
    /// `rsync -a --delete`, falling back to the native copy when unavailable
    Rsync,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable artifact caching (default: true)
    pub enabled: bool,

    /// Cache root directory (default: platform cache dir)
    pub root: Option<PathBuf>,

    /// Remove entries older than N days (0 = disabled)
    pub ttl_days: u32,

    /// Artifact directory names eligible for caching, in restore order
    pub artifacts: Vec<String>,

    /// Copy strategy
    pub copier: CopierKind,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: None,
            ttl_days: 14,
            artifacts: vec![
                "node_modules".to_string(),
                ".next".to_string(),
                "dist".to_string(),
                "build".to_string(),
                ".expo".to_string(),
            ],
            copier: CopierKind::Native,
        }
    }
}

/// Change detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangesConfig {
    /// Default baseline ref for `hoard changes`
    pub base_ref: String,
}

impl Default for ChangesConfig {
    fn default() -> Self {
        Self {
            base_ref: "origin/main".to_string(),
        }
    }
}
