//! Incremental change detection
//!
//! Classifies the files changed since a baseline ref into the workspaces
//! they belong to. Anything that can affect every workspace (root manifests,
//! root config, the shared lockfile) forces a full rebuild, and so does any
//! failure to compute the diff.

use crate::cache::PackageManager;
use crate::error::{HoardError, HoardResult};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Root files whose change affects every workspace
pub const ROOT_CONFIG_FILES: &[&str] = &[
    "package.json",
    "turbo.json",
    "tsconfig.json",
    "tsconfig.base.json",
    "pnpm-workspace.yaml",
    ".nvmrc",
    ".node-version",
];

/// Files changed since a baseline, grouped by workspace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub changed_workspaces: BTreeSet<String>,
    pub changed_files: Vec<String>,
    pub requires_full_rebuild: bool,
}

impl ChangeSet {
    /// The result used when the diff cannot be trusted
    pub fn full_rebuild() -> Self {
        Self {
            requires_full_rebuild: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.requires_full_rebuild && self.changed_workspaces.is_empty()
    }

    /// Workspaces to rebuild out of `all`
    pub fn affected<'a>(&self, all: &'a [String]) -> Vec<&'a String> {
        all.iter()
            .filter(|ws| self.requires_full_rebuild || self.changed_workspaces.contains(*ws))
            .collect()
    }
}

/// Source of changed file paths (repo-relative, `/`-separated)
#[async_trait]
pub trait DiffProvider: Send + Sync {
    async fn changed_files(&self, base_ref: &str) -> HoardResult<Vec<String>>;
}

/// `git diff --name-only <base>` against the working tree
pub struct GitDiff {
    repo_root: PathBuf,
}

impl GitDiff {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }
}

#[async_trait]
impl DiffProvider for GitDiff {
    async fn changed_files(&self, base_ref: &str) -> HoardResult<Vec<String>> {
        // git would parse a leading dash as one of its own options
        if base_ref.is_empty() || base_ref.starts_with('-') {
            return Err(HoardError::InvalidRef(base_ref.to_string()));
        }

        let args = ["diff", "--name-only", base_ref, "--"];
        debug!("Executing: git {:?} in {}", args, self.repo_root.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| HoardError::command_failed(format!("git {:?}", args), e))?;

        if !output.status.success() {
            return Err(HoardError::command_exec(
                format!("git diff --name-only {}", base_ref),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Maps a diff onto workspaces
pub struct ChangeDetector {
    provider: Box<dyn DiffProvider>,
    containers: Vec<String>,
}

impl ChangeDetector {
    pub fn new(provider: Box<dyn DiffProvider>, containers: Vec<String>) -> Self {
        Self {
            provider,
            containers,
        }
    }

    /// Detector backed by git in `repo_root`
    pub fn git(repo_root: &Path, containers: Vec<String>) -> Self {
        Self::new(Box::new(GitDiff::new(repo_root)), containers)
    }

    /// Classify changes since `base_ref`; never fails
    pub async fn detect_changes(&self, base_ref: &str) -> ChangeSet {
        match self.provider.changed_files(base_ref).await {
            Ok(files) => self.classify(files),
            Err(e) => {
                warn!(
                    "Change detection against {} failed, assuming everything changed: {}",
                    base_ref, e
                );
                ChangeSet::full_rebuild()
            }
        }
    }

    fn classify(&self, files: Vec<String>) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for file in &files {
            let path = file.trim_start_matches("./");

            if ROOT_CONFIG_FILES.contains(&path) {
                debug!("Root config changed: {}", path);
                changes.requires_full_rebuild = true;
            }

            if let Some(workspace) = self.workspace_of(path) {
                changes.changed_workspaces.insert(workspace.to_string());
            }

            if is_shared_lockfile(path) {
                debug!("Shared lockfile changed: {}", path);
                changes.requires_full_rebuild = true;
            }
        }

        changes.changed_files = files;
        changes
    }

    /// Workspace id for a path like `workspaces/<id>/...`
    fn workspace_of<'a>(&self, path: &'a str) -> Option<&'a str> {
        self.containers.iter().find_map(|container| {
            let rest = path
                .strip_prefix(container.trim_end_matches('/'))?
                .strip_prefix('/')?;
            let id = rest.split('/').next()?;
            // A file directly inside the container is not a workspace
            (!id.is_empty() && rest.len() > id.len()).then_some(id)
        })
    }
}

fn is_shared_lockfile(path: &str) -> bool {
    PackageManager::all()
        .iter()
        .any(|pm| pm.lockfile_name() == path)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDiff(HoardResult<Vec<String>>);

    #[async_trait]
    impl DiffProvider for FixedDiff {
        async fn changed_files(&self, _base_ref: &str) -> HoardResult<Vec<String>> {
            match &self.0 {
                Ok(files) => Ok(files.clone()),
                Err(e) => Err(HoardError::command_exec("git diff", e.to_string())),
            }
        }
    }

    fn detector(files: &[&str]) -> ChangeDetector {
        let files = files.iter().map(|f| f.to_string()).collect();
        ChangeDetector::new(
            Box::new(FixedDiff(Ok(files))),
            vec!["workspaces".to_string()],
        )
    }

    #[tokio::test]
    async fn empty_diff_means_no_changes() {
        let changes = detector(&[]).detect_changes("HEAD~1").await;

        assert!(changes.is_empty());
        assert_eq!(changes, ChangeSet::default());
    }

    #[tokio::test]
    async fn workspace_files_are_grouped_and_deduplicated() {
        let changes = detector(&[
            "workspaces/web/src/page.tsx",
            "workspaces/web/package.json",
            "workspaces/backend/main.py",
            "docs/README.md",
        ])
        .detect_changes("origin/main")
        .await;

        assert!(!changes.requires_full_rebuild);
        assert_eq!(
            changes.changed_workspaces.into_iter().collect::<Vec<_>>(),
            vec!["backend", "web"]
        );
        assert_eq!(changes.changed_files.len(), 4);
    }

    #[tokio::test]
    async fn root_manifest_forces_full_rebuild() {
        let changes = detector(&["package.json", "workspaces/web/next.config.js"])
            .detect_changes("origin/main")
            .await;

        assert!(changes.requires_full_rebuild);
        assert!(changes.changed_workspaces.contains("web"));
    }

    #[tokio::test]
    async fn shared_lockfile_forces_full_rebuild() {
        let changes = detector(&["pnpm-lock.yaml"]).detect_changes("main").await;

        assert!(changes.requires_full_rebuild);
        assert!(changes.changed_workspaces.is_empty());
    }

    #[tokio::test]
    async fn nested_manifest_is_not_a_root_change() {
        let changes = detector(&["workspaces/mobile/package.json", "tools/tsconfig.json"])
            .detect_changes("main")
            .await;

        assert!(!changes.requires_full_rebuild);
        assert!(changes.changed_workspaces.contains("mobile"));
    }

    #[tokio::test]
    async fn file_directly_in_container_is_ignored() {
        let changes = detector(&["workspaces/README.md", "workspacesfoo/x/y"])
            .detect_changes("main")
            .await;

        assert!(changes.changed_workspaces.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_full_rebuild() {
        let failing = ChangeDetector::new(
            Box::new(FixedDiff(Err(HoardError::command_exec(
                "git diff",
                "fatal: bad revision",
            )))),
            vec!["workspaces".to_string()],
        );

        let changes = failing.detect_changes("no-such-ref").await;

        assert!(changes.requires_full_rebuild);
        assert!(changes.changed_workspaces.is_empty());
        assert!(changes.changed_files.is_empty());
    }

    #[tokio::test]
    async fn git_outside_repository_degrades_to_full_rebuild() {
        let temp = tempfile::TempDir::new().unwrap();
        let detector = ChangeDetector::git(temp.path(), vec!["workspaces".to_string()]);

        let changes = detector.detect_changes("definitely-not-a-ref").await;

        assert_eq!(changes, ChangeSet::full_rebuild());
    }

    #[tokio::test]
    async fn option_like_base_ref_is_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        let injected = temp.path().join("injected.txt");
        let base_ref = format!("--output={}", injected.display());

        let err = GitDiff::new(temp.path())
            .changed_files(&base_ref)
            .await
            .unwrap_err();
        assert!(matches!(err, HoardError::InvalidRef(_)));

        let detector = ChangeDetector::git(temp.path(), vec!["workspaces".to_string()]);
        let changes = detector.detect_changes(&base_ref).await;

        assert!(changes.requires_full_rebuild);
        assert!(!injected.exists());
        assert!(detector.detect_changes("").await.requires_full_rebuild);
    }

    #[test]
    fn affected_respects_full_rebuild() {
        let all = vec!["api".to_string(), "web".to_string()];

        let mut changes = ChangeSet::default();
        changes.changed_workspaces.insert("web".to_string());
        assert_eq!(changes.affected(&all), vec![&all[1]]);

        assert_eq!(ChangeSet::full_rebuild().affected(&all).len(), 2);
    }
}
