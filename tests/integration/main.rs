//! Integration tests for Hoard

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// A small monorepo plus a config file pointing hoard at it
    struct Fixture {
        temp: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path().join("repo");
            let web = root.join("workspaces").join("web");

            fs::create_dir_all(web.join("node_modules").join("react")).unwrap();
            fs::write(web.join("node_modules").join("react").join("index.js"), "react").unwrap();
            fs::create_dir_all(web.join("dist")).unwrap();
            fs::write(web.join("dist").join("main.js"), "bundle").unwrap();
            fs::write(
                web.join("package.json"),
                r#"{"name":"@acme/web","dependencies":{"react":"18.2.0"}}"#,
            )
            .unwrap();
            fs::write(root.join("package-lock.json"), r#"{"lockfileVersion":3}"#).unwrap();
            fs::write(root.join(".nvmrc"), "20.11.0\n").unwrap();

            let config = format!(
                "[workspace]\nroot = '{}'\n\n[cache]\nroot = '{}'\n",
                root.display(),
                temp.path().join("cache").display()
            );
            fs::write(temp.path().join("config.toml"), config).unwrap();

            Self { temp }
        }

        fn root(&self) -> PathBuf {
            self.temp.path().join("repo")
        }

        fn web(&self) -> PathBuf {
            self.root().join("workspaces").join("web")
        }

        fn cache_root(&self) -> PathBuf {
            self.temp.path().join("cache")
        }

        fn hoard(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("hoard");
            cmd.current_dir(self.temp.path())
                .env("HOARD_CONFIG", self.temp.path().join("config.toml"))
                .env_remove("HOARD_LOG_FORMAT")
                .arg("--no-local");
            cmd
        }
    }

    fn hoard() -> Command {
        cargo_bin_cmd!("hoard")
    }

    fn stdout_of(cmd: &mut Command) -> String {
        let output = cmd.output().unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    }

    fn remove(path: &Path) {
        fs::remove_dir_all(path).unwrap();
    }

    #[test]
    fn help_displays() {
        hoard()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("workspace build-artifact cache"));
    }

    #[test]
    fn version_displays() {
        hoard()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("hoard"));
    }

    #[test]
    fn config_path_uses_override() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]").and(predicate::str::contains("ttl_days = 14")));
    }

    #[test]
    fn invalid_config_fails_with_hint() {
        let fixture = Fixture::new();
        fs::write(fixture.temp.path().join("config.toml"), "[cache\n").unwrap();

        fixture
            .hoard()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn key_is_stable() {
        let fixture = Fixture::new();

        let first = stdout_of(fixture.hoard().args(["key", "web"]));
        let second = stdout_of(fixture.hoard().args(["key", "workspaces/web"]));

        assert_eq!(first, second);
        assert!(first.trim().contains("-20.11.0-"));
    }

    #[test]
    fn key_without_configured_root_matches_across_directories() {
        let fixture = Fixture::new();
        let config = format!("[cache]\nroot = '{}'\n", fixture.cache_root().display());
        fs::write(fixture.temp.path().join("config.toml"), config).unwrap();

        let from_root = stdout_of(
            fixture
                .hoard()
                .current_dir(fixture.root())
                .args(["key", "web"]),
        );
        let from_workspace = stdout_of(fixture.hoard().current_dir(fixture.web()).arg("key"));

        assert_eq!(from_root, from_workspace);
        assert!(from_root.trim().contains("-20.11.0-"));
    }

    #[test]
    fn key_changes_with_dependencies() {
        let fixture = Fixture::new();
        let before = stdout_of(fixture.hoard().args(["key", "web"]));

        fs::write(
            fixture.web().join("package.json"),
            r#"{"name":"@acme/web","dependencies":{"react":"18.3.0"}}"#,
        )
        .unwrap();
        let after = stdout_of(fixture.hoard().args(["key", "web"]));

        assert_ne!(before, after);
    }

    #[test]
    fn key_json_lists_inputs() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["key", "web", "--format", "json"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("\"packageManager\": \"npm\"")
                    .and(predicate::str::contains("\"runtimeVersion\": \"20.11.0\"")),
            );
    }

    #[test]
    fn unknown_workspace_fails() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["restore", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Workspace not found: nope"));
    }

    #[test]
    fn restore_miss_is_not_an_error() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["restore", "web"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache miss"));
    }

    #[test]
    fn save_then_restore() {
        let fixture = Fixture::new();

        fixture
            .hoard()
            .args(["save", "web"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Saved web"));

        remove(&fixture.web().join("node_modules"));
        remove(&fixture.web().join("dist"));

        fixture
            .hoard()
            .args(["restore", "web"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored web"));

        assert_eq!(
            fs::read_to_string(fixture.web().join("dist").join("main.js")).unwrap(),
            "bundle"
        );
        assert!(fixture
            .web()
            .join("node_modules")
            .join("react")
            .join("index.js")
            .is_file());
        assert!(!fs::read_dir(fixture.cache_root())
            .unwrap()
            .filter_map(Result::ok)
            .any(|e| e.file_name().to_string_lossy().ends_with(".lock")));
    }

    #[test]
    fn list_after_save() {
        let fixture = Fixture::new();
        let key = stdout_of(fixture.hoard().args(["key", "web"]));
        fixture.hoard().args(["save", "web"]).assert().success();

        fixture
            .hoard()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(key.trim()));

        fixture
            .hoard()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"workspace\": \"workspaces/web\""));
    }

    #[test]
    fn held_lock_skips_save() {
        let fixture = Fixture::new();
        let key = stdout_of(fixture.hoard().args(["key", "web"]));
        fs::create_dir_all(fixture.cache_root()).unwrap();
        fs::write(fixture.cache_root().join(format!("{}.lock", key.trim())), "").unwrap();

        fixture
            .hoard()
            .args(["save", "web"])
            .assert()
            .success()
            .stdout(predicate::str::contains("being written by another process"));

        assert!(!fixture.cache_root().join(key.trim()).exists());
    }

    #[test]
    fn clean_and_clear() {
        let fixture = Fixture::new();
        fixture.hoard().args(["save", "web"]).assert().success();

        fixture
            .hoard()
            .args(["clean", "--dry-run"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries older than 14 days"));

        fixture
            .hoard()
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared 2 cache item(s)"));

        fixture
            .hoard()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache entries found"));
    }

    #[test]
    fn install_cmd_scopes_npm_by_path() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["install-cmd", "web"])
            .assert()
            .success()
            .stdout(predicate::str::contains("npm install --workspace workspaces/web"));
    }

    #[test]
    fn env_filters_by_workspace_kind() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["env", "web"])
            .env("NEXT_PUBLIC_HOARD_IT", "1")
            .env("EXPO_PUBLIC_HOARD_IT", "1")
            .assert()
            .success()
            .stdout(
                predicate::str::contains("NEXT_PUBLIC_HOARD_IT=1")
                    .and(predicate::str::contains("EXPO_PUBLIC_HOARD_IT").not()),
            );
    }

    #[test]
    fn env_check_reports_production_errors() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["env", "backend", "--check"])
            .env("NODE_ENV", "production")
            .env_remove("JWT_SECRET_KEY")
            .env_remove("DATABASE_URL")
            .env_remove("ENABLE_DATABASE")
            .assert()
            .success()
            .stdout(predicate::str::contains("JWT_SECRET_KEY is required in production"));
    }

    #[test]
    fn changes_outside_git_requires_full_rebuild() {
        let fixture = Fixture::new();
        fixture
            .hoard()
            .args(["changes", "--base", "no-such-ref", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"requiresFullRebuild\": true"));
    }
}
