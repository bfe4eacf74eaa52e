//! Cache key derivation
//!
//! A key is the `-`-joined list of whichever components are discoverable:
//!
//! 1. lockfile hash
//! 2. runtime version (verbatim, filesystem-safe)
//! 3. hash of the sorted direct + dev dependency map
//! 4. one hash per tracked build config file, in a fixed order
//!
//! Derivation reads files only and never fails; a workspace with no inputs
//! gets the key `default`.

use crate::cache::lockfile::{detect_lockfile, hash_file_contents, short_hash, LockfileInfo};
use crate::cache::manifest::{PackageManifest, MANIFEST_FILE};
use crate::cache::CacheSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path};
use tracing::debug;

/// Files pinning the Node.js version, checked in order
pub const RUNTIME_PIN_FILES: &[&str] = &[".nvmrc", ".node-version"];

/// Build config files folded into the key, in key order
pub const CONFIG_FILES: &[&str] = &[
    "tsconfig.json",
    "next.config.js",
    "next.config.mjs",
    "app.json",
    "babel.config.js",
    "metro.config.js",
    "vite.config.ts",
    "turbo.json",
];

/// Deterministic fingerprint of a workspace's buildable state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key used when no input is discoverable
    pub const DEFAULT: &'static str = "default";

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the key names exactly one entry inside the cache root
    ///
    /// Rejects empty keys, `.`/`..`, separators and leading dots.
    pub fn is_path_safe(&self) -> bool {
        if self.0.is_empty() || self.0.starts_with('.') {
            return false;
        }
        let mut components = Path::new(&self.0).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(name)), None) if name.to_str() == Some(self.0.as_str())
        )
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a workspace's `package.json`
#[derive(Debug, Clone)]
pub enum ManifestState {
    Missing,
    Parsed(PackageManifest),
    /// Present but not valid JSON for the manifest schema; raw bytes kept
    Unparsable(Vec<u8>),
}

impl ManifestState {
    /// Read the manifest in `dir`
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(MANIFEST_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::Missing,
            Err(e) => {
                debug!("Cannot read {}: {}", path.display(), e);
                return Self::Missing;
            }
        };

        match serde_json::from_slice::<PackageManifest>(&bytes) {
            Ok(manifest) => Self::Parsed(manifest),
            Err(e) => {
                debug!("Manifest {} is unparsable: {}", path.display(), e);
                Self::Unparsable(bytes)
            }
        }
    }

    pub fn parsed(&self) -> Option<&PackageManifest> {
        match self {
            Self::Parsed(manifest) => Some(manifest),
            _ => None,
        }
    }

    /// Hash of the sorted dependency map, or of the raw bytes if unparsable
    pub fn dependency_hash(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Parsed(manifest) => serde_json::to_vec(&manifest.merged_dependencies())
                .ok()
                .map(|bytes| short_hash(&bytes)),
            Self::Unparsable(bytes) => Some(short_hash(bytes)),
        }
    }
}

/// Everything that goes into a workspace's cache key
#[derive(Debug, Clone)]
pub struct KeyInputs {
    pub lockfile: Option<LockfileInfo>,
    pub runtime_version: Option<String>,
    pub dependency_hash: Option<String>,
    pub config_hashes: Vec<(&'static str, String)>,
    pub manifest: ManifestState,
}

impl KeyInputs {
    /// Collect key inputs for a workspace
    pub fn collect(settings: &CacheSettings, workspace: &Path) -> Self {
        let dir = settings.workspace_dir(workspace);
        let root = settings.workspace_root.as_path();
        let manifest = ManifestState::load(&dir);

        let config_hashes = CONFIG_FILES
            .iter()
            .filter_map(|name| {
                let path = dir.join(name);
                if !path.is_file() {
                    return None;
                }
                match hash_file_contents(&path) {
                    Ok(hash) => Some((*name, hash)),
                    Err(e) => {
                        debug!("Skipping config file: {}", e);
                        None
                    }
                }
            })
            .collect();

        Self {
            lockfile: detect_lockfile(&dir, root),
            runtime_version: runtime_version(&dir, root, manifest.parsed()),
            dependency_hash: manifest.dependency_hash(),
            config_hashes,
            manifest,
        }
    }

    /// Join the present components into a key
    pub fn key(&self) -> CacheKey {
        let mut components: Vec<String> = Vec::new();

        if let Some(lockfile) = &self.lockfile {
            components.push(lockfile.hash.clone());
        }
        if let Some(version) = &self.runtime_version {
            components.push(sanitize_component(version));
        }
        if let Some(hash) = &self.dependency_hash {
            components.push(hash.clone());
        }
        components.extend(self.config_hashes.iter().map(|(_, hash)| hash.clone()));

        if components.is_empty() {
            CacheKey::default()
        } else {
            CacheKey(components.join("-"))
        }
    }
}

/// Derive the cache key for a workspace
pub fn derive_key(settings: &CacheSettings, workspace: &Path) -> CacheKey {
    KeyInputs::collect(settings, workspace).key()
}

/// Node.js version from a pin file (workspace, then root) or `engines.node`
pub fn runtime_version(
    workspace_dir: &Path,
    root: &Path,
    manifest: Option<&PackageManifest>,
) -> Option<String> {
    let mut dirs = vec![workspace_dir];
    if root != workspace_dir {
        dirs.push(root);
    }

    for dir in dirs {
        for name in RUNTIME_PIN_FILES {
            if let Ok(content) = fs::read_to_string(dir.join(name)) {
                let version = content.trim();
                if !version.is_empty() {
                    return Some(version.to_string());
                }
            }
        }
    }

    manifest
        .and_then(PackageManifest::node_engine)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Replace characters that cannot appear in a directory name
///
/// Leading dots become `_` so a pin such as `..` cannot name a parent
/// directory or a hidden one.
fn sanitize_component(value: &str) -> String {
    let body = value.trim_start_matches('.');
    let mut sanitized = "_".repeat(value.len() - body.len());
    sanitized.extend(body.chars().map(|c| match c {
        'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '+' => c,
        _ => '_',
    }));
    sanitized
}
