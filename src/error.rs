//! Error types for hoard
//!
//! Internal helpers return `HoardResult<T>`. Public cache operations catch
//! these, log them and degrade to a cache miss instead of propagating.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for hoard operations
pub type HoardResult<T> = Result<T, HoardError>;

/// All errors that can occur in hoard
#[derive(Error, Debug)]
pub enum HoardError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration already exists: {0}")]
    ConfigExists(PathBuf),

    #[error("{0}")]
    User(String),

    // Workspace errors
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Cache root is not a directory: {0}")]
    CacheRootInvalid(PathBuf),

    #[error("Cache key does not name an entry inside the cache root: {0:?}")]
    UnsafeCacheKey(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid git ref: {0:?}")]
    InvalidRef(String),

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl HoardError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::WorkspaceNotFound(_) => {
                Some("Pass a workspace id (e.g. web) or a path containing package.json")
            }
            Self::ConfigInvalid { .. } => Some("Run: hoard config show"),
            Self::ConfigExists(_) => Some("Use --force to overwrite"),
            Self::CacheRootInvalid(_) => Some("Set [cache] root in .hoard.toml"),
            _ => None,
        }
    }
}
