//! `package.json` parsing
//!
//! Only the fields the cache cares about are typed; everything else is kept
//! in `extra` so a manifest survives a parse without losing data.

use crate::error::{HoardError, HoardResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Manifest file name
pub const MANIFEST_FILE: &str = "package.json";

/// Parsed `package.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    /// Package name (e.g. `@acme/web`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Package version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Runtime dependencies
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Declared engine constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engines: Option<Engines>,

    /// Corepack package manager pin (e.g. `pnpm@8.15.1`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,

    /// Workspace globs declared by a monorepo root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<WorkspacesField>,

    /// Every field not modelled above
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `engines` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Engines {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// `workspaces` is either a glob list or yarn's `{ packages: [...] }` form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkspacesField {
    Globs(Vec<String>),
    Detailed {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl WorkspacesField {
    /// Workspace globs regardless of form
    pub fn globs(&self) -> &[String] {
        match self {
            Self::Globs(globs) => globs,
            Self::Detailed { packages } => packages,
        }
    }
}

impl PackageManifest {
    /// Parse a manifest from a JSON string
    pub fn parse(content: &str) -> HoardResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse a manifest from disk
    pub fn from_file(path: &Path) -> HoardResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HoardError::io(format!("reading manifest {}", path.display()), e))?;
        Self::parse(&content)
    }

    /// Direct and dev dependencies merged into one sorted map
    ///
    /// A package listed in both keeps its `devDependencies` range.
    pub fn merged_dependencies(&self) -> BTreeMap<String, String> {
        let mut merged = self.dependencies.clone();
        merged.extend(
            self.dev_dependencies
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }

    /// Declared `engines.node` constraint
    pub fn node_engine(&self) -> Option<&str> {
        self.engines.as_ref().and_then(|e| e.node.as_deref())
    }
}
