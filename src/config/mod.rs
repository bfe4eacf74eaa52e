//! Configuration management for hoard

pub mod schema;

pub use schema::{Config, CopierKind};

use crate::error::{HoardError, HoardResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = ".hoard.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hoard")
            .join("config.toml")
    }

    /// Get the default cache root
    pub fn default_cache_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("hoard")
    }

    /// Find the nearest `.hoard.toml`, walking up from `start`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> HoardResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load the global config with a project-local file layered on top
    ///
    /// Tables merge recursively; any other value in the local file replaces
    /// the global one. A relative `workspace.root` in the local file resolves
    /// against the local file's directory, and defaults to it when unset.
    pub async fn load_merged(&self, local: Option<&Path>) -> HoardResult<Config> {
        let mut merged = self.read_value(&self.config_path).await?;

        if let Some(local_path) = local {
            let local_value = self.read_value(local_path).await?;
            merge_values(&mut merged, local_value);
        }

        let mut config: Config = merged.try_into().map_err(|e: toml::de::Error| {
            HoardError::ConfigInvalid {
                path: local
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.config_path.clone()),
                reason: e.to_string(),
            }
        })?;

        if let Some(local_dir) = local.and_then(Path::parent) {
            config.workspace.root = Some(match config.workspace.root.take() {
                Some(root) if root.is_relative() => local_dir.join(root),
                Some(root) => root,
                None => local_dir.to_path_buf(),
            });
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> HoardResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| HoardError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| HoardError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    async fn read_value(&self, path: &Path) -> HoardResult<toml::Value> {
        if !path.exists() {
            return Ok(toml::Value::Table(toml::map::Map::new()));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| HoardError::io(format!("reading config from {}", path.display()), e))?;

        content
            .parse::<toml::Table>()
            .map(toml::Value::Table)
            .map_err(|e| HoardError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> HoardResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            HoardError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> HoardResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| HoardError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
