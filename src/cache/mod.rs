//! Workspace build-artifact cache
//!
//! Caches whole artifact directories (`node_modules`, `.next`, `dist`, ...)
//! per workspace, addressed by a key derived from the workspace's lockfile,
//! runtime version, dependency map and build config files.
//!
//! # Layout
//!
//! | Path | Description |
//! |------|-------------|
//! | `<root>/<key>/` | Finalized entry, one subdirectory per artifact |
//! | `<root>/<key>.meta.json` | Entry metadata |
//! | `<root>/<key>.tmp/` | Staging directory while a save is in progress |
//! | `<root>/<key>.lock` | Writer lock, present only during a save |
//!
//! Entries are never modified in place: a save for an existing key stages a
//! complete copy and swaps it in.

pub mod copy;
pub mod evict;
pub mod key;
pub mod lock;
pub mod lockfile;
pub mod manifest;
pub mod store;

pub use copy::{FallbackCopier, NativeCopier, RsyncCopier, TreeCopier};
pub use evict::{EvictionSweeper, SweepReport};
pub use key::{derive_key, CacheKey};
pub use lock::CacheLock;
pub use lockfile::{detect_lockfile, detect_package_manager, LockfileInfo, PackageManager};
pub use manifest::PackageManifest;
pub use store::{ArtifactStore, EntryMetadata, SaveOutcome};

use crate::config::{Config, ConfigManager, CopierKind};
use crate::workspace::discover_root;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Suffix of the writer lock marker
pub const LOCK_SUFFIX: &str = ".lock";
/// Suffix of the staging directory
pub const STAGING_SUFFIX: &str = ".tmp";
/// Suffix of the metadata file
pub const META_SUFFIX: &str = ".meta.json";
/// Artifact whose restore is integrity-checked
pub const DEPENDENCY_ARTIFACT: &str = "node_modules";

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Runtime settings threaded through every cache component
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Monorepo root
    pub workspace_root: PathBuf,
    /// Directory holding cache entries
    pub cache_root: PathBuf,
    /// Maximum entry age (None = never evict)
    pub ttl: Option<Duration>,
    /// Artifact directory names, in restore order
    pub artifacts: Vec<String>,
    /// Workspace container directories under the root
    pub containers: Vec<String>,
    /// Copy strategy
    pub copier: CopierKind,
}

impl CacheSettings {
    /// Settings with default artifacts, containers and a 14 day TTL
    pub fn new(workspace_root: impl Into<PathBuf>, cache_root: impl Into<PathBuf>) -> Self {
        let defaults = Config::default();
        Self {
            workspace_root: workspace_root.into(),
            cache_root: cache_root.into(),
            ttl: ttl_from_days(defaults.cache.ttl_days),
            artifacts: defaults.cache.artifacts,
            containers: defaults.workspace.containers,
            copier: defaults.cache.copier,
        }
    }

    /// Build settings from loaded configuration
    ///
    /// Without a configured root, the monorepo root is discovered from `cwd`
    /// upwards and `cwd` itself is the last resort.
    pub fn from_config(config: &Config, cwd: &Path) -> Self {
        let workspace_root = match &config.workspace.root {
            Some(root) if root.is_relative() => cwd.join(root),
            Some(root) => root.clone(),
            None => discover_root(cwd, &config.workspace.containers)
                .unwrap_or_else(|| cwd.to_path_buf()),
        };
        let cache_root = match &config.cache.root {
            Some(root) if root.is_relative() => workspace_root.join(root),
            Some(root) => root.clone(),
            None => ConfigManager::default_cache_root(),
        };

        Self {
            workspace_root,
            cache_root,
            ttl: ttl_from_days(config.cache.ttl_days),
            artifacts: config.cache.artifacts.clone(),
            containers: config.workspace.containers.clone(),
            copier: config.cache.copier,
        }
    }

    /// Override the TTL in days (0 disables eviction)
    pub fn with_ttl_days(mut self, days: u32) -> Self {
        self.ttl = ttl_from_days(days);
        self
    }

    /// Override the artifact list
    pub fn with_artifacts<I, S>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artifacts = artifacts.into_iter().map(Into::into).collect();
        self
    }

    /// Path of the entry directory for a key
    ///
    /// Callers check `CacheKey::is_path_safe` first; other keys would
    /// resolve outside their own entry.
    pub fn entry_dir(&self, key: &CacheKey) -> PathBuf {
        debug_assert!(key.is_path_safe(), "unsafe cache key {:?}", key.as_str());
        self.cache_root.join(key.as_str())
    }

    /// Path of the metadata file for a key
    pub fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_root.join(format!("{}{}", key, META_SUFFIX))
    }

    /// Path of the staging directory for a key
    pub fn staging_dir(&self, key: &CacheKey) -> PathBuf {
        self.cache_root.join(format!("{}{}", key, STAGING_SUFFIX))
    }

    /// Path of the lock marker for a key
    pub fn lock_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_root.join(format!("{}{}", key, LOCK_SUFFIX))
    }

    /// Resolve a workspace path against the monorepo root
    pub fn workspace_dir(&self, workspace: &Path) -> PathBuf {
        if workspace.is_absolute() {
            workspace.to_path_buf()
        } else {
            self.workspace_root.join(workspace)
        }
    }

    /// Workspace path as recorded in metadata (root-relative when possible)
    pub fn workspace_label(&self, workspace: &Path) -> String {
        let dir = self.workspace_dir(workspace);
        let Ok(relative) = dir.strip_prefix(&self.workspace_root) else {
            return dir.display().to_string();
        };
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// TTL for a day count (0 disables eviction)
pub fn ttl_from_days(days: u32) -> Option<Duration> {
    (days > 0).then(|| Duration::from_secs(u64::from(days) * SECS_PER_DAY))
}

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
