//! Artifact save and restore
//!
//! `save` copies a workspace's artifact directories into a staging directory
//! under the writer lock, then swaps the staging directory in as the entry.
//! `restore` copies an entry's artifacts back into the workspace without
//! taking the lock; entries are never mutated after they are swapped in.
//!
//! Neither operation fails: a failed restore is a cache miss and a failed
//! save is a warning.

use crate::cache::copy::{copier_for, is_non_empty_dir, tree_size, TreeCopier};
use crate::cache::key::{CacheKey, KeyInputs};
use crate::cache::lock::CacheLock;
use crate::cache::lockfile::{detect_package_manager, PackageManager};
use crate::cache::{
    CacheSettings, DEPENDENCY_ARTIFACT, LOCK_SUFFIX, META_SUFFIX, STAGING_SUFFIX,
};
use crate::error::{HoardError, HoardResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Metadata written next to each entry as `<key>.meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    pub key: CacheKey,
    /// Workspace path relative to the monorepo root
    pub workspace: String,
    /// Save time, epoch milliseconds
    pub timestamp: i64,
    /// Total bytes of cached files
    pub size: u64,
    /// Artifact directories in the entry
    pub artifacts: Vec<String>,
    /// Merged direct + dev dependencies at save time
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,
    pub package_manager: PackageManager,
}

/// Result of a save
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Entry written
    Saved {
        key: CacheKey,
        artifacts: Vec<String>,
        size: u64,
    },
    /// Another writer holds the key; nothing was touched
    Contended { key: CacheKey },
    /// Workspace has no artifact directories
    NothingToSave { key: CacheKey },
    /// Save failed; logged and ignored
    Failed { key: CacheKey, reason: String },
    /// Caching is turned off in configuration
    Disabled { key: CacheKey },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    pub fn key(&self) -> &CacheKey {
        match self {
            Self::Saved { key, .. }
            | Self::Contended { key }
            | Self::NothingToSave { key }
            | Self::Disabled { key }
            | Self::Failed { key, .. } => key,
        }
    }
}

/// Result of a restore
#[derive(Debug, Clone, PartialEq)]
pub struct RestoreReport {
    pub key: CacheKey,
    /// Artifacts copied into the workspace
    pub restored: Vec<String>,
}

impl RestoreReport {
    /// True if at least one artifact was restored
    pub fn is_hit(&self) -> bool {
        !self.restored.is_empty()
    }
}

/// Staging directory removed on drop unless it was moved into place
struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    fn create(path: PathBuf) -> HoardResult<Self> {
        remove_path(&path)?;
        fs::create_dir_all(&path)
            .map_err(|e| HoardError::io(format!("creating staging {}", path.display()), e))?;
        Ok(Self { path })
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = remove_path(&self.path) {
            warn!("Failed to remove staging {}: {}", self.path.display(), e);
        }
    }
}

/// Key-addressed artifact store rooted at `settings.cache_root`
pub struct ArtifactStore {
    settings: CacheSettings,
    copier: Box<dyn TreeCopier>,
}

impl ArtifactStore {
    /// Create a store using the configured copier
    pub fn new(settings: CacheSettings) -> Self {
        let copier = copier_for(settings.copier);
        Self { settings, copier }
    }

    /// Create a store with an explicit copier
    pub fn with_copier(settings: CacheSettings, copier: Box<dyn TreeCopier>) -> Self {
        Self { settings, copier }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Restore cached artifacts into a workspace; true on a hit
    pub fn restore(&self, workspace: &Path) -> bool {
        self.restore_report(workspace).is_hit()
    }

    /// Restore cached artifacts, reporting which ones were copied
    pub fn restore_report(&self, workspace: &Path) -> RestoreReport {
        let key = KeyInputs::collect(&self.settings, workspace).key();
        let mut restored = Vec::new();
        if !key.is_path_safe() {
            warn!("Refusing to restore from unsafe cache key {:?}", key.as_str());
            return RestoreReport { key, restored };
        }

        let entry_dir = self.settings.entry_dir(&key);
        let workspace_dir = self.settings.workspace_dir(workspace);

        if !entry_dir.is_dir() {
            debug!("Cache miss for {} ({})", workspace.display(), key);
            return RestoreReport { key, restored };
        }

        for artifact in &self.settings.artifacts {
            let cached = entry_dir.join(artifact);
            if !cached.is_dir() {
                continue;
            }

            let live = workspace_dir.join(artifact);
            match self.restore_artifact(&cached, &live, artifact) {
                Ok(true) => restored.push(artifact.clone()),
                Ok(false) => {}
                Err(e) => warn!("Failed to restore {} for {}: {}", artifact, key, e),
            }
        }

        if restored.is_empty() {
            info!("Cache entry {} had nothing restorable", key);
        } else {
            info!(
                "Restored {} from cache {} ({})",
                workspace.display(),
                key,
                restored.join(", ")
            );
        }

        RestoreReport { key, restored }
    }

    /// Replace `live` with a copy of `cached`; false if the integrity check fails
    fn restore_artifact(&self, cached: &Path, live: &Path, artifact: &str) -> HoardResult<bool> {
        remove_path(live)?;

        if let Err(e) = self.copier.copy_tree(cached, live) {
            // Leave no half-copied artifact behind
            if let Err(cleanup) = remove_path(live) {
                warn!("Failed to clean up {}: {}", live.display(), cleanup);
            }
            return Err(e);
        }

        if artifact == DEPENDENCY_ARTIFACT && !is_non_empty_dir(live) {
            warn!("Restored {} is empty, discarding it", live.display());
            remove_path(live)?;
            return Ok(false);
        }

        debug!("Restored {}", live.display());
        Ok(true)
    }

    /// Save a workspace's artifacts; never fails
    pub fn save(&self, workspace: &Path) -> SaveOutcome {
        let inputs = KeyInputs::collect(&self.settings, workspace);
        let key = inputs.key();

        match self.try_save(workspace, &inputs, &key) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to save cache for {}: {}", workspace.display(), e);
                SaveOutcome::Failed {
                    key,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_save(
        &self,
        workspace: &Path,
        inputs: &KeyInputs,
        key: &CacheKey,
    ) -> HoardResult<SaveOutcome> {
        if !key.is_path_safe() {
            return Err(HoardError::UnsafeCacheKey(key.to_string()));
        }

        let cache_root = &self.settings.cache_root;
        if cache_root.exists() && !cache_root.is_dir() {
            return Err(HoardError::CacheRootInvalid(cache_root.clone()));
        }

        let Some(_lock) = CacheLock::try_acquire(cache_root, key)? else {
            info!(
                "Cache {} is being written by another process, skipping save",
                key
            );
            return Ok(SaveOutcome::Contended { key: key.clone() });
        };

        let workspace_dir = self.settings.workspace_dir(workspace);
        let staging = StagingDir::create(self.settings.staging_dir(key))?;
        let mut artifacts = Vec::new();

        for artifact in &self.settings.artifacts {
            let live = workspace_dir.join(artifact);
            if !live.is_dir() {
                continue;
            }

            match self.copier.copy_tree(&live, &staging.path.join(artifact)) {
                Ok(()) => artifacts.push(artifact.clone()),
                Err(e) => {
                    warn!("Skipping artifact {} for {}: {}", artifact, key, e);
                    remove_path(&staging.path.join(artifact))?;
                }
            }
        }

        if artifacts.is_empty() {
            debug!("No artifacts to cache in {}", workspace_dir.display());
            return Ok(SaveOutcome::NothingToSave { key: key.clone() });
        }

        let size = tree_size(&staging.path);
        let entry_dir = self.settings.entry_dir(key);

        // Wholesale replacement: the old entry goes, the staged one moves in.
        remove_path(&entry_dir)?;
        fs::rename(&staging.path, &entry_dir).map_err(|e| {
            HoardError::io(
                format!("moving {} into place", staging.path.display()),
                e,
            )
        })?;

        let metadata = EntryMetadata {
            key: key.clone(),
            workspace: self.settings.workspace_label(workspace),
            timestamp: Utc::now().timestamp_millis(),
            size,
            artifacts: artifacts.clone(),
            dependencies: inputs
                .manifest
                .parsed()
                .map(|m| m.merged_dependencies())
                .unwrap_or_default(),
            node_version: inputs.runtime_version.clone(),
            package_manager: detect_package_manager(
                &workspace_dir,
                &self.settings.workspace_root,
                inputs.manifest.parsed(),
            ),
        };
        self.write_metadata(key, &metadata)?;

        info!(
            "Saved {} to cache {} ({})",
            workspace.display(),
            key,
            artifacts.join(", ")
        );

        Ok(SaveOutcome::Saved {
            key: key.clone(),
            artifacts,
            size,
        })
    }

    fn write_metadata(&self, key: &CacheKey, metadata: &EntryMetadata) -> HoardResult<()> {
        let path = self.settings.meta_path(key);
        let tmp = path.with_file_name(format!("{}{}{}", key, META_SUFFIX, STAGING_SUFFIX));
        let content = serde_json::to_string_pretty(metadata)?;

        fs::write(&tmp, content)
            .map_err(|e| HoardError::io(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .map_err(|e| HoardError::io(format!("moving {} into place", tmp.display()), e))
    }

    /// Read the metadata for a key, if present and valid
    pub fn metadata(&self, key: &CacheKey) -> Option<EntryMetadata> {
        let path = self.settings.meta_path(key);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(meta) => Some(meta),
            Err(e) => {
                debug!("Ignoring invalid metadata {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Whether an entry exists for `key`
    pub fn contains(&self, key: &CacheKey) -> bool {
        key.is_path_safe() && self.settings.entry_dir(key).is_dir()
    }

    /// All entries with readable metadata, newest first
    pub fn list_entries(&self) -> HoardResult<Vec<EntryMetadata>> {
        let cache_root = &self.settings.cache_root;
        if !cache_root.exists() {
            return Ok(vec![]);
        }

        let read_dir = fs::read_dir(cache_root).map_err(|e| {
            HoardError::io(format!("reading cache root {}", cache_root.display()), e)
        })?;

        let mut entries: Vec<EntryMetadata> = read_dir
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let key = name.strip_suffix(META_SUFFIX)?;
                self.metadata(&CacheKey::from(key))
            })
            .collect();

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Remove every entry, metadata file and staging directory
    ///
    /// Lock markers are left alone so in-flight saves keep their exclusion.
    pub fn clear(&self) -> HoardResult<usize> {
        let cache_root = &self.settings.cache_root;
        if !cache_root.exists() {
            return Ok(0);
        }

        let read_dir = fs::read_dir(cache_root).map_err(|e| {
            HoardError::io(format!("reading cache root {}", cache_root.display()), e)
        })?;

        let mut removed = 0;
        for entry in read_dir.filter_map(Result::ok) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(LOCK_SUFFIX) {
                continue;
            }
            match remove_path(&entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }

        info!("Cleared {} cache item(s)", removed);
        Ok(removed)
    }

    /// Remove every lock marker
    ///
    /// Only safe when no save is running; markers of killed saves otherwise
    /// block their key until the sweeper ages them out.
    pub fn clear_locks(&self) -> HoardResult<usize> {
        let cache_root = &self.settings.cache_root;
        if !cache_root.exists() {
            return Ok(0);
        }

        let read_dir = fs::read_dir(cache_root).map_err(|e| {
            HoardError::io(format!("reading cache root {}", cache_root.display()), e)
        })?;

        let mut removed = 0;
        for entry in read_dir.filter_map(Result::ok) {
            if !entry.file_name().to_string_lossy().ends_with(LOCK_SUFFIX) {
                continue;
            }
            match remove_path(&entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }

        info!("Removed {} lock marker(s)", removed);
        Ok(removed)
    }
}

/// Remove a file or directory tree; missing paths are fine
pub(crate) fn remove_path(path: &Path) -> HoardResult<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(HoardError::io(format!("inspecting {}", path.display()), e)),
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HoardError::io(format!("removing {}", path.display()), e)),
    }
}
