//! TTL-based eviction
//!
//! Every top-level item in the cache root (entry directories and metadata
//! files) is judged by its own modification time. Lock markers and staging
//! directories belong to in-flight saves; they are only removed once they
//! outlive the TTL, which means the save that created them was killed.
//!
//! The sweep does not take per-key locks, so it can race a save that is
//! swapping in a fresh entry for an expired key.

use crate::cache::copy::tree_size;
use crate::cache::store::remove_path;
use crate::cache::{CacheSettings, LOCK_SUFFIX, STAGING_SUFFIX};
use crate::error::{HoardError, HoardResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Result of an eviction sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Items examined
    pub scanned: usize,
    /// Items removed (or that would be, in dry-run mode)
    pub removed: Vec<PathBuf>,
    /// Lock markers and staging directories abandoned by interrupted saves
    pub stale_markers: Vec<PathBuf>,
    /// Bytes reclaimed
    pub bytes_reclaimed: u64,
    /// Per-item failures (non-fatal)
    pub errors: Vec<String>,
}

/// Removes cache items older than the configured TTL
pub struct EvictionSweeper {
    cache_root: PathBuf,
    ttl: Option<Duration>,
    dry_run: bool,
}

impl EvictionSweeper {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            cache_root: settings.cache_root.clone(),
            ttl: settings.ttl,
            dry_run: false,
        }
    }

    /// Override the TTL (None disables eviction)
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Report what would be removed without deleting anything
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Remove every item whose age exceeds the TTL
    pub fn cleanup_expired(&self) -> SweepReport {
        self.cleanup_expired_at(SystemTime::now())
    }

    fn cleanup_expired_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        let Some(ttl) = self.ttl else {
            debug!("Eviction disabled (ttl = 0)");
            return report;
        };

        let read_dir = match fs::read_dir(&self.cache_root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                warn!("Cannot read cache root {}: {}", self.cache_root.display(), e);
                report
                    .errors
                    .push(format!("{}: {}", self.cache_root.display(), e));
                return report;
            }
        };

        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable cache item: {}", e);
                    report.errors.push(e.to_string());
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            let is_marker = name.ends_with(LOCK_SUFFIX) || name.ends_with(STAGING_SUFFIX);
            if !is_marker {
                report.scanned += 1;
            }

            match self.evict_if_expired(&path, ttl, now) {
                Ok(Some(bytes)) => {
                    report.bytes_reclaimed += bytes;
                    if is_marker {
                        info!("Stale marker from an interrupted save: {}", path.display());
                        report.stale_markers.push(path);
                    } else {
                        report.removed.push(path);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    report.errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        if !report.removed.is_empty() {
            info!(
                "{} {} expired cache item(s)",
                if self.dry_run { "Would remove" } else { "Removed" },
                report.removed.len()
            );
        }

        report
    }

    /// Remove `path` if older than `ttl`, returning the bytes reclaimed
    fn evict_if_expired(
        &self,
        path: &Path,
        ttl: Duration,
        now: SystemTime,
    ) -> HoardResult<Option<u64>> {
        let meta = fs::symlink_metadata(path)
            .map_err(|e| HoardError::io(format!("inspecting {}", path.display()), e))?;
        let modified = meta
            .modified()
            .map_err(|e| HoardError::io(format!("reading mtime of {}", path.display()), e))?;

        // Timestamps in the future count as fresh.
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= ttl {
            return Ok(None);
        }

        let size = if meta.is_dir() { tree_size(path) } else { meta.len() };

        if self.dry_run {
            debug!("Would remove {} ({} bytes)", path.display(), size);
        } else {
            remove_path(path)?;
            debug!("Removed {} ({} bytes)", path.display(), size);
        }

        Ok(Some(size))
    }
}
