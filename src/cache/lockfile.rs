//! Lockfile detection and hashing
//!
//! Finds the package manager lockfile that governs a workspace and hashes
//! its raw bytes. Same lockfile = same hash component in the cache key.

use crate::cache::manifest::PackageManifest;
use crate::error::{HoardError, HoardResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of hex characters kept from a SHA-256 digest
pub const SHORT_HASH_LEN: usize = 8;

/// Supported JavaScript package managers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
}

impl PackageManager {
    /// Lockfile written by this package manager
    pub fn lockfile_name(&self) -> &'static str {
        match self {
            Self::Npm => "package-lock.json",
            Self::Yarn => "yarn.lock",
            Self::Pnpm => "pnpm-lock.yaml",
        }
    }

    /// All package managers in lockfile priority order
    pub fn all() -> &'static [Self] {
        &[Self::Pnpm, Self::Yarn, Self::Npm]
    }

    /// Parse a manifest `packageManager` field such as `pnpm@8.15.1`
    pub fn from_manifest_field(field: &str) -> Option<Self> {
        let name = field.split('@').next().unwrap_or(field).trim();
        match name {
            "npm" => Some(Self::Npm),
            "yarn" => Some(Self::Yarn),
            "pnpm" => Some(Self::Pnpm),
            _ => None,
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
        };
        write!(f, "{}", name)
    }
}

/// Information about a detected lockfile
#[derive(Debug, Clone)]
pub struct LockfileInfo {
    /// The package manager this lockfile belongs to
    pub manager: PackageManager,
    /// Path to the lockfile
    pub path: PathBuf,
    /// Truncated SHA-256 of the lockfile contents
    pub hash: String,
}

/// Hash raw bytes with SHA-256, returning the first 8 hex chars
pub fn short_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..SHORT_HASH_LEN / 2])
}

/// Hash a file's contents, returning the first 8 hex chars
pub fn hash_file_contents(path: &Path) -> HoardResult<String> {
    let contents =
        fs::read(path).map_err(|e| HoardError::io(format!("reading {}", path.display()), e))?;
    Ok(short_hash(&contents))
}

/// Candidate lockfile paths in priority order
///
/// Workspace-local lockfiles win over the shared one at the monorepo root.
fn lockfile_candidates(workspace_dir: &Path, root: &Path) -> Vec<(PackageManager, PathBuf)> {
    let mut dirs = vec![workspace_dir];
    if root != workspace_dir {
        dirs.push(root);
    }

    dirs.into_iter()
        .flat_map(|dir| {
            PackageManager::all()
                .iter()
                .map(move |pm| (*pm, dir.join(pm.lockfile_name())))
        })
        .collect()
}

/// Find and hash the lockfile that governs a workspace
///
/// Returns `None` when no candidate exists or the first one found is
/// unreadable.
pub fn detect_lockfile(workspace_dir: &Path, root: &Path) -> Option<LockfileInfo> {
    let (manager, path) = lockfile_candidates(workspace_dir, root)
        .into_iter()
        .find(|(_, path)| path.is_file())?;

    match hash_file_contents(&path) {
        Ok(hash) => {
            debug!("Found {} lockfile: {}", manager, path.display());
            Some(LockfileInfo {
                manager,
                path,
                hash,
            })
        }
        Err(e) => {
            debug!("Skipping unreadable lockfile: {}", e);
            None
        }
    }
}

/// Detect the package manager for a workspace
///
/// Lockfile kind wins, then the manifest `packageManager` field, then npm.
pub fn detect_package_manager(
    workspace_dir: &Path,
    root: &Path,
    manifest: Option<&PackageManifest>,
) -> PackageManager {
    if let Some((manager, _)) = lockfile_candidates(workspace_dir, root)
        .into_iter()
        .find(|(_, path)| path.is_file())
    {
        return manager;
    }

    manifest
        .and_then(|m| m.package_manager.as_deref())
        .and_then(PackageManager::from_manifest_field)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn package_manager_display() {
        assert_eq!(PackageManager::Npm.to_string(), "npm");
        assert_eq!(PackageManager::Pnpm.to_string(), "pnpm");
    }

    #[test]
    fn package_manager_from_field() {
        assert_eq!(
            PackageManager::from_manifest_field("pnpm@8.15.1"),
            Some(PackageManager::Pnpm)
        );
        assert_eq!(
            PackageManager::from_manifest_field("yarn"),
            Some(PackageManager::Yarn)
        );
        assert_eq!(PackageManager::from_manifest_field("bun@1.0.0"), None);
    }

    #[test]
    fn hash_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.lock");
        fs::write(&path, b"test content").unwrap();

        let hash1 = hash_file_contents(&path).unwrap();
        let hash2 = hash_file_contents(&path).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), SHORT_HASH_LEN);
    }

    #[test]
    fn hash_different_content() {
        assert_ne!(short_hash(b"content 1"), short_hash(b"content 2"));
    }

    #[test]
    fn detect_prefers_pnpm_over_npm() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        fs::write(dir.path().join("pnpm-lock.yaml"), "lockfileVersion: 6").unwrap();

        let info = detect_lockfile(dir.path(), dir.path()).unwrap();
        assert_eq!(info.manager, PackageManager::Pnpm);
        assert_eq!(info.path, dir.path().join("pnpm-lock.yaml"));
    }

    #[test]
    fn detect_workspace_lockfile_before_root() {
        let root = TempDir::new().unwrap();
        let ws = root.path().join("workspaces").join("web");
        fs::create_dir_all(&ws).unwrap();
        fs::write(root.path().join("pnpm-lock.yaml"), "root").unwrap();
        fs::write(ws.join("package-lock.json"), "local").unwrap();

        let info = detect_lockfile(&ws, root.path()).unwrap();
        assert_eq!(info.manager, PackageManager::Npm);
        assert_eq!(info.hash, short_hash(b"local"));
    }

    #[test]
    fn detect_falls_back_to_root_lockfile() {
        let root = TempDir::new().unwrap();
        let ws = root.path().join("workspaces").join("api");
        fs::create_dir_all(&ws).unwrap();
        fs::write(root.path().join("yarn.lock"), "# yarn").unwrap();

        let info = detect_lockfile(&ws, root.path()).unwrap();
        assert_eq!(info.manager, PackageManager::Yarn);
    }

    #[test]
    fn detect_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert!(detect_lockfile(dir.path(), dir.path()).is_none());
        assert_eq!(
            detect_package_manager(dir.path(), dir.path(), None),
            PackageManager::Npm
        );
    }

    #[test]
    fn package_manager_from_manifest_without_lockfile() {
        let dir = TempDir::new().unwrap();
        let manifest = PackageManifest::parse(r#"{"packageManager": "yarn@4.1.0"}"#).unwrap();

        assert_eq!(
            detect_package_manager(dir.path(), dir.path(), Some(&manifest)),
            PackageManager::Yarn
        );
    }
}
