//! Workspace lookup
//!
//! Workspaces live one per subdirectory of a container directory under the
//! monorepo root (`<root>/workspaces/<id>`). A workspace can be named by id,
//! by a root-relative path, or by an absolute path.

use crate::cache::lockfile::PackageManager;
use crate::cache::manifest::{PackageManifest, MANIFEST_FILE};
use crate::cache::CacheSettings;
use crate::error::{HoardError, HoardResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A resolved workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Workspace {
    /// Directory name, used for environment and install scoping
    pub id: String,
    /// Absolute directory
    pub path: PathBuf,
}

impl Workspace {
    fn from_dir(path: PathBuf) -> Self {
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { id, path }
    }

    /// Whether the workspace has a `package.json`
    pub fn has_manifest(&self) -> bool {
        self.path.join(MANIFEST_FILE).is_file()
    }
}

/// Resolve an id, root-relative path or absolute path to a workspace
pub fn resolve(settings: &CacheSettings, name: &str) -> HoardResult<Workspace> {
    let given = Path::new(name);

    let candidates: Vec<PathBuf> = if given.is_absolute() {
        vec![given.to_path_buf()]
    } else {
        settings
            .containers
            .iter()
            .map(|container| settings.workspace_root.join(container).join(given))
            .chain(std::iter::once(settings.workspace_root.join(given)))
            .collect()
    };

    let dir = candidates
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .ok_or_else(|| HoardError::WorkspaceNotFound(name.to_string()))?;

    debug!("Resolved workspace {} to {}", name, dir.display());
    Ok(Workspace::from_dir(normalize(&dir)))
}

/// Every workspace with a manifest under the configured containers, sorted by id
pub fn discover(settings: &CacheSettings) -> Vec<Workspace> {
    let mut found: Vec<Workspace> = settings
        .containers
        .iter()
        .map(|container| settings.workspace_root.join(container))
        .filter_map(|container| fs::read_dir(&container).ok())
        .flat_map(|read_dir| read_dir.filter_map(Result::ok))
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .map(Workspace::from_dir)
        .filter(Workspace::has_manifest)
        .collect();

    found.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.path.cmp(&b.path)));
    found
}

/// File present only at a pnpm monorepo root
const PNPM_WORKSPACE_FILE: &str = "pnpm-workspace.yaml";

/// Nearest ancestor of `start` that looks like the monorepo root
///
/// Ancestors holding a workspace container, `pnpm-workspace.yaml` or a
/// `package.json` with a `workspaces` field win. Failing that, the nearest
/// ancestor with a lockfile is used.
pub fn discover_root(start: &Path, containers: &[String]) -> Option<PathBuf> {
    let declares_workspaces = |dir: &Path| {
        containers.iter().any(|c| dir.join(c).is_dir())
            || dir.join(PNPM_WORKSPACE_FILE).is_file()
            || PackageManifest::from_file(&dir.join(MANIFEST_FILE))
                .map(|m| m.workspaces.is_some())
                .unwrap_or(false)
    };
    let has_lockfile = |dir: &Path| {
        PackageManager::all()
            .iter()
            .any(|pm| dir.join(pm.lockfile_name()).is_file())
    };

    let root = start
        .ancestors()
        .find(|dir| declares_workspaces(dir))
        .or_else(|| start.ancestors().find(|dir| has_lockfile(dir)))?;

    debug!("Discovered monorepo root {}", root.display());
    Some(root.to_path_buf())
}

/// Canonical path when possible, so `./web` and `web` agree
fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn monorepo() -> (TempDir, CacheSettings) {
        let temp = TempDir::new().unwrap();
        for id in ["web", "backend", "mobile"] {
            let dir = temp.path().join("workspaces").join(id);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("package.json"), format!(r#"{{"name":"@acme/{}"}}"#, id))
                .unwrap();
        }
        fs::create_dir_all(temp.path().join("workspaces").join("scratch")).unwrap();
        fs::create_dir_all(temp.path().join("tools").join("lint")).unwrap();

        let root = fs::canonicalize(temp.path()).unwrap();
        let settings = CacheSettings::new(&root, root.join(".cache"));
        (temp, settings)
    }

    #[test]
    fn resolves_by_id() {
        let (_temp, settings) = monorepo();

        let ws = resolve(&settings, "web").unwrap();

        assert_eq!(ws.id, "web");
        assert_eq!(ws.path, settings.workspace_root.join("workspaces").join("web"));
        assert!(ws.has_manifest());
    }

    #[test]
    fn resolves_relative_and_absolute_paths() {
        let (_temp, settings) = monorepo();
        let expected = settings.workspace_root.join("workspaces").join("backend");

        assert_eq!(resolve(&settings, "workspaces/backend").unwrap().path, expected);
        assert_eq!(
            resolve(&settings, expected.to_str().unwrap()).unwrap().path,
            expected
        );

        let tools = resolve(&settings, "tools/lint").unwrap();
        assert_eq!(tools.id, "lint");
        assert!(!tools.has_manifest());
    }

    #[test]
    fn unknown_workspace_is_an_error() {
        let (_temp, settings) = monorepo();

        let err = resolve(&settings, "nope").unwrap_err();

        assert!(matches!(err, HoardError::WorkspaceNotFound(ref name) if name == "nope"));
    }

    #[test]
    fn discover_lists_workspaces_with_manifests() {
        let (_temp, settings) = monorepo();

        let ids: Vec<String> = discover(&settings).into_iter().map(|ws| ws.id).collect();

        assert_eq!(ids, vec!["backend", "mobile", "web"]);
    }

    #[test]
    fn discover_missing_container_is_empty() {
        let temp = TempDir::new().unwrap();
        let settings = CacheSettings::new(temp.path(), temp.path().join(".cache"));

        assert!(discover(&settings).is_empty());
    }

    #[test]
    fn root_found_from_inside_a_workspace() {
        let (temp, _settings) = monorepo();
        let containers = vec!["workspaces".to_string()];
        let web = temp.path().join("workspaces").join("web");

        assert_eq!(discover_root(&web, &containers).as_deref(), Some(temp.path()));
        assert_eq!(
            discover_root(temp.path(), &containers).as_deref(),
            Some(temp.path())
        );
    }

    #[test]
    fn root_markers_beat_workspace_lockfile() {
        let temp = TempDir::new().unwrap();
        let app = temp.path().join("apps").join("site");
        fs::create_dir_all(&app).unwrap();
        fs::write(app.join("yarn.lock"), "# local").unwrap();
        fs::write(
            temp.path().join("package.json"),
            r#"{"workspaces": {"packages": ["apps/*"]}}"#,
        )
        .unwrap();

        assert_eq!(discover_root(&app, &[]).as_deref(), Some(temp.path()));

        fs::remove_file(temp.path().join("package.json")).unwrap();
        fs::write(temp.path().join(PNPM_WORKSPACE_FILE), "packages: ['apps/*']").unwrap();
        assert_eq!(discover_root(&app, &[]).as_deref(), Some(temp.path()));
    }

    #[test]
    fn lockfile_is_the_fallback_marker() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("pkg").join("src");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("pkg").join("package-lock.json"), "{}").unwrap();

        assert_eq!(
            discover_root(&nested, &[]).as_deref(),
            Some(temp.path().join("pkg").as_path())
        );
    }
}
