//! Public entry point for build orchestrators
//!
//! `CacheManager` ties the cache components to one set of `CacheSettings`.
//! None of its cache operations fail: misses, contention and I/O problems are
//! logged and reported through return values.

use crate::cache::copy::TreeCopier;
use crate::cache::evict::{EvictionSweeper, SweepReport};
use crate::cache::key::{derive_key, CacheKey, KeyInputs};
use crate::cache::store::{ArtifactStore, EntryMetadata, RestoreReport, SaveOutcome};
use crate::cache::CacheSettings;
use crate::changes::{ChangeDetector, ChangeSet, DiffProvider};
use crate::config::Config;
use crate::env::{EnvironmentReport, EnvironmentResolver};
use crate::error::HoardResult;
use crate::install::{scoped_install_command, InstallCommand};
use crate::workspace::{self, Workspace};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Workspace cache facade
pub struct CacheManager {
    store: ArtifactStore,
    detector: ChangeDetector,
    environment: EnvironmentResolver,
    enabled: bool,
}

impl CacheManager {
    /// Manager over explicit settings, using git for change detection
    pub fn new(settings: CacheSettings) -> Self {
        let detector = ChangeDetector::git(&settings.workspace_root, settings.containers.clone());
        Self {
            store: ArtifactStore::new(settings),
            detector,
            environment: EnvironmentResolver::from_process_env(),
            enabled: true,
        }
    }

    /// Manager built from loaded configuration
    pub fn from_config(config: &Config, cwd: &Path) -> Self {
        let mut manager = Self::new(CacheSettings::from_config(config, cwd));
        manager.enabled = config.cache.enabled;
        manager
    }

    /// Turn save/restore on or off
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replace the diff source
    pub fn with_diff_provider(mut self, provider: Box<dyn DiffProvider>) -> Self {
        let containers = self.settings().containers.clone();
        self.detector = ChangeDetector::new(provider, containers);
        self
    }

    /// Replace the copy strategy
    pub fn with_copier(mut self, copier: Box<dyn TreeCopier>) -> Self {
        let settings = self.store.settings().clone();
        self.store = ArtifactStore::with_copier(settings, copier);
        self
    }

    /// Replace the environment snapshot
    pub fn with_environment(mut self, environment: EnvironmentResolver) -> Self {
        self.environment = environment;
        self
    }

    pub fn settings(&self) -> &CacheSettings {
        self.store.settings()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Cache key for a workspace
    pub fn workspace_cache_key(&self, workspace: &Path) -> CacheKey {
        derive_key(self.settings(), workspace)
    }

    /// The inputs behind a workspace's key
    pub fn key_inputs(&self, workspace: &Path) -> KeyInputs {
        KeyInputs::collect(self.settings(), workspace)
    }

    /// Workspaces changed since `base_ref`
    pub async fn detect_changes(&self, base_ref: &str) -> ChangeSet {
        self.detector.detect_changes(base_ref).await
    }

    /// Restore cached artifacts; true on a hit
    pub fn restore_workspace_cache(&self, workspace: &Path) -> bool {
        self.restore_report(workspace).is_hit()
    }

    /// Restore cached artifacts, reporting which ones were copied
    pub fn restore_report(&self, workspace: &Path) -> RestoreReport {
        if !self.enabled {
            debug!("Cache disabled, skipping restore of {}", workspace.display());
            return RestoreReport {
                key: self.workspace_cache_key(workspace),
                restored: vec![],
            };
        }
        self.store.restore_report(workspace)
    }

    /// Save a workspace's artifacts
    pub fn save_workspace_cache(&self, workspace: &Path) -> SaveOutcome {
        if !self.enabled {
            debug!("Cache disabled, skipping save of {}", workspace.display());
            return SaveOutcome::Disabled {
                key: self.workspace_cache_key(workspace),
            };
        }
        self.store.save(workspace)
    }

    /// Remove entries older than the TTL
    pub fn cleanup_expired_cache(&self) -> SweepReport {
        self.sweeper().cleanup_expired()
    }

    /// Eviction sweeper over this manager's cache root
    pub fn sweeper(&self) -> EvictionSweeper {
        EvictionSweeper::new(self.settings())
    }

    /// Environment variables a workspace's build should receive
    pub fn validate_workspace_environment(&self, workspace_id: &str) -> BTreeMap<String, String> {
        self.environment.validate_workspace_environment(workspace_id)
    }

    /// Feature-flag problems in a workspace's environment
    pub fn check_workspace_environment(&self, workspace_id: &str) -> EnvironmentReport {
        self.environment.check_workspace_environment(workspace_id)
    }

    /// Dependency install command scoped to one workspace
    pub fn scoped_install_command(&self, workspace_id: &str) -> InstallCommand {
        let path = self.locate(workspace_id);
        scoped_install_command(self.settings(), &path, workspace_id)
    }

    /// Cached entries, newest first
    pub fn list_entries(&self) -> HoardResult<Vec<EntryMetadata>> {
        self.store.list_entries()
    }

    /// Metadata for one key
    pub fn entry(&self, key: &CacheKey) -> Option<EntryMetadata> {
        self.store.metadata(key)
    }

    /// Remove every cache entry
    pub fn clear_cache(&self) -> HoardResult<usize> {
        self.store.clear()
    }

    /// Remove lock markers left by interrupted saves
    pub fn clear_locks(&self) -> HoardResult<usize> {
        self.store.clear_locks()
    }

    /// Workspaces under the configured containers
    pub fn workspaces(&self) -> Vec<Workspace> {
        workspace::discover(self.settings())
    }

    /// Resolve a workspace id or path
    pub fn resolve_workspace(&self, name: &str) -> HoardResult<Workspace> {
        workspace::resolve(self.settings(), name)
    }

    /// Directory for an id, assuming the first container when it does not exist yet
    fn locate(&self, workspace_id: &str) -> PathBuf {
        match self.resolve_workspace(workspace_id) {
            Ok(ws) => ws.path,
            Err(_) => {
                let settings = self.settings();
                match settings.containers.first() {
                    Some(container) => settings.workspace_root.join(container).join(workspace_id),
                    None => settings.workspace_root.join(workspace_id),
                }
            }
        }
    }
}
