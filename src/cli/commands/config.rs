//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, CopierKind, LOCAL_CONFIG_FILE};
use crate::error::{HoardError, HoardResult};
use console::style;
use std::path::Path;
use tokio::fs;

/// Keys accepted by `config set`
const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "workspace.root",
    "workspace.containers",
    "cache.enabled",
    "cache.root",
    "cache.ttl_days",
    "cache.artifacts",
    "cache.copier",
    "changes.base_ref",
];

/// Keys stored as arrays
const LIST_KEYS: &[&str] = &["workspace.containers", "cache.artifacts"];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    config: &Config,
    manager: &ConfigManager,
) -> HoardResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value, local }) => {
            if local {
                set_local_value(&key, &value).await?
            } else {
                set_value(manager, &key, &value).await?
            }
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> HoardResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> HoardResult<()> {
    let path = manager.path();

    if path.exists() && !force {
        return Err(HoardError::ConfigExists(path.to_path_buf()));
    }

    manager.save(&Config::default()).await?;
    println!(
        "{} Configuration initialized at {}",
        style("✓").green(),
        path.display()
    );

    Ok(())
}

/// Set a key in the global config file
async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> HoardResult<()> {
    validate_config_key(key, value)?;

    let path = manager.path().to_path_buf();
    let mut doc = read_document(&path).await?;
    set_toml_value(&mut doc, key, value)?;

    // Reject documents that no longer deserialize before writing them
    let config: Config = doc.clone().try_into().map_err(|e: toml::de::Error| {
        HoardError::ConfigInvalid {
            path: path.clone(),
            reason: e.to_string(),
        }
    })?;
    manager.save(&config).await?;

    println!("{} Set {} = {}", style("✓").green(), key, value);
    Ok(())
}

async fn set_local_value(key: &str, value: &str) -> HoardResult<()> {
    validate_config_key(key, value)?;

    let cwd = std::env::current_dir().map_err(|e| HoardError::io("getting current directory", e))?;
    let local_path =
        ConfigManager::find_local_config(&cwd).unwrap_or_else(|| cwd.join(LOCAL_CONFIG_FILE));

    let mut doc = read_document(&local_path).await?;
    set_toml_value(&mut doc, key, value)?;

    // Write back only the keys the user has explicitly set
    let content = toml::to_string_pretty(&doc)?;
    fs::write(&local_path, content)
        .await
        .map_err(|e| HoardError::io(format!("writing {}", local_path.display()), e))?;

    println!(
        "{} Set {} = {} in {}",
        style("✓").green(),
        key,
        value,
        local_path.display()
    );

    Ok(())
}

async fn read_document(path: &Path) -> HoardResult<toml::Value> {
    if !path.exists() {
        return Ok(toml::Value::Table(toml::map::Map::new()));
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| HoardError::io(format!("reading {}", path.display()), e))?;
    content
        .parse::<toml::Table>()
        .map(toml::Value::Table)
        .map_err(|e| HoardError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Validate that a config key is one we recognise, and its value where typed
fn validate_config_key(key: &str, value: &str) -> HoardResult<()> {
    if !VALID_KEYS.contains(&key) {
        let valid = VALID_KEYS.join(", ");
        return Err(HoardError::User(format!(
            "Unknown config key: {} (valid keys: {})",
            key, valid
        )));
    }

    match key {
        "cache.enabled" => parse_bool(value).map(|_| ()),
        "cache.ttl_days" => value
            .parse::<u32>()
            .map(|_| ())
            .map_err(|_| HoardError::User(format!("Invalid number: {}", value))),
        "cache.copier" => toml::Value::String(value.to_string())
            .try_into::<CopierKind>()
            .map(|_| ())
            .map_err(|_| HoardError::User(format!("Invalid copier: {} (native or rsync)", value))),
        _ => Ok(()),
    }
}

/// Set a dot-separated key in a TOML value tree, creating intermediate tables as needed.
fn set_toml_value(doc: &mut toml::Value, key: &str, value: &str) -> HoardResult<()> {
    let (sections, leaf) = match key.rsplit_once('.') {
        Some((sections, leaf)) => (sections.split('.').collect::<Vec<_>>(), leaf),
        None => (vec![], key),
    };

    let mut current = doc;
    for part in sections {
        current = current
            .as_table_mut()
            .ok_or_else(|| HoardError::User(format!("Expected table at key: {}", part)))?
            .entry(part)
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    let table = current
        .as_table_mut()
        .ok_or_else(|| HoardError::User(format!("Expected table for key: {}", key)))?;

    let toml_value = if LIST_KEYS.contains(&key) {
        toml::Value::Array(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| toml::Value::String(s.to_string()))
                .collect(),
        )
    } else if value == "true" || value == "false" {
        toml::Value::Boolean(value == "true")
    } else if let Ok(n) = value.parse::<i64>() {
        toml::Value::Integer(n)
    } else {
        toml::Value::String(value.to_string())
    };

    table.insert(leaf.to_string(), toml_value);
    Ok(())
}

fn parse_bool(value: &str) -> HoardResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(HoardError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}
