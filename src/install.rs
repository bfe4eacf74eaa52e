//! Scoped dependency install commands
//!
//! Builds the command that installs dependencies for a single workspace
//! rather than the whole monorepo. The command is returned, not run.

use crate::cache::lockfile::{detect_package_manager, PackageManager};
use crate::cache::manifest::{PackageManifest, MANIFEST_FILE};
use crate::cache::CacheSettings;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl InstallCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for InstallCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Install command scoped to one workspace
///
/// npm scopes by path, yarn and pnpm by package name. The name comes from
/// the workspace manifest and falls back to `workspace_id`.
pub fn scoped_install_command(
    settings: &CacheSettings,
    workspace: &Path,
    workspace_id: &str,
) -> InstallCommand {
    let dir = settings.workspace_dir(workspace);
    let manifest = PackageManifest::from_file(&dir.join(MANIFEST_FILE)).ok();
    let manager = detect_package_manager(&dir, &settings.workspace_root, manifest.as_ref());

    let name = manifest
        .as_ref()
        .and_then(|m| m.name.as_deref())
        .unwrap_or(workspace_id);

    match manager {
        PackageManager::Npm => {
            let relative = settings.workspace_label(workspace);
            InstallCommand::new("npm", &["install", "--workspace", &relative])
        }
        PackageManager::Yarn => InstallCommand::new("yarn", &["workspaces", "focus", name]),
        PackageManager::Pnpm => InstallCommand::new("pnpm", &["install", "--filter", name]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn monorepo(lockfile: Option<&str>, manifest: &str) -> (TempDir, CacheSettings) {
        let temp = TempDir::new().unwrap();
        let ws = temp.path().join("workspaces").join("web");
        fs::create_dir_all(&ws).unwrap();
        fs::write(ws.join("package.json"), manifest).unwrap();
        if let Some(lockfile) = lockfile {
            fs::write(temp.path().join(lockfile), "lock").unwrap();
        }
        let settings = CacheSettings::new(temp.path(), temp.path().join(".cache"));
        (temp, settings)
    }

    #[test]
    fn npm_scopes_by_relative_path() {
        let (_temp, settings) = monorepo(Some("package-lock.json"), r#"{"name":"@acme/web"}"#);

        let cmd = scoped_install_command(&settings, Path::new("workspaces/web"), "web");

        assert_eq!(cmd.to_string(), "npm install --workspace workspaces/web");
    }

    #[test]
    fn yarn_focuses_manifest_name() {
        let (_temp, settings) = monorepo(Some("yarn.lock"), r#"{"name":"@acme/web"}"#);

        let cmd = scoped_install_command(&settings, Path::new("workspaces/web"), "web");

        assert_eq!(cmd.program, "yarn");
        assert_eq!(cmd.args, vec!["workspaces", "focus", "@acme/web"]);
    }

    #[test]
    fn pnpm_filter_falls_back_to_id() {
        let (_temp, settings) = monorepo(Some("pnpm-lock.yaml"), "{}");

        let cmd = scoped_install_command(&settings, Path::new("workspaces/web"), "web");

        assert_eq!(cmd.to_string(), "pnpm install --filter web");
    }

    #[test]
    fn manifest_field_selects_manager_without_lockfile() {
        let (_temp, settings) = monorepo(None, r#"{"name":"web","packageManager":"pnpm@8.15.1"}"#);

        let cmd = scoped_install_command(&settings, Path::new("workspaces/web"), "web");

        assert_eq!(cmd.program, "pnpm");
    }

    #[test]
    fn display_quotes_whitespace() {
        let cmd = InstallCommand::new("npm", &["install", "--workspace", "my app"]);
        assert_eq!(cmd.to_string(), "npm install --workspace 'my app'");
    }
}
