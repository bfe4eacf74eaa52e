//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Hoard - workspace build-artifact cache
///
/// Derives dependency-aware cache keys for monorepo workspaces and saves,
/// restores and evicts their build artifacts.
#[derive(Parser, Debug)]
#[command(name = "hoard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "HOARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .hoard.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,

    /// Log output format (defaults to general.log_format)
    #[arg(long, global = true, value_enum, env = "HOARD_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the cache key for a workspace
    Key(KeyArgs),

    /// List workspaces changed since a git ref
    Changes(ChangesArgs),

    /// Restore cached artifacts into a workspace
    Restore(WorkspaceArgs),

    /// Save a workspace's artifacts to the cache
    Save(WorkspaceArgs),

    /// Remove cache entries older than the TTL
    Clean(CleanArgs),

    /// List cache entries
    List(ListArgs),

    /// Remove every cache entry
    Clear(ClearArgs),

    /// Show the environment a workspace build receives
    Env(EnvArgs),

    /// Print the scoped dependency install command for a workspace
    InstallCmd(InstallCmdArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// A workspace id, root-relative path or absolute path
#[derive(Parser, Debug)]
pub struct WorkspaceArgs {
    /// Workspace (defaults to the current directory)
    pub workspace: Option<String>,
}

/// Arguments for the key command
#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Workspace (defaults to the current directory)
    pub workspace: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the changes command
#[derive(Parser, Debug)]
pub struct ChangesArgs {
    /// Baseline ref (default: changes.base_ref)
    #[arg(short, long)]
    pub base: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Remove entries older than N days (default: from config)
    #[arg(long)]
    pub days: Option<u32>,

    /// Dry run - show what would be removed
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Also remove lock markers left by interrupted saves
    #[arg(long)]
    pub locks: bool,
}

/// Arguments for the env command
#[derive(Parser, Debug)]
pub struct EnvArgs {
    /// Workspace id (e.g. web, backend)
    pub workspace: String,

    /// Report missing or inconsistent variables instead of listing them
    #[arg(long)]
    pub check: bool,

    /// Print variable names only
    #[arg(long, conflicts_with = "check")]
    pub names_only: bool,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the install-cmd command
#[derive(Parser, Debug)]
pub struct InstallCmdArgs {
    /// Workspace id (e.g. web, backend)
    pub workspace: String,

    /// Output format
    #[arg(short, long, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.ttl_days)
        key: String,
        /// Value to set
        value: String,
        /// Write to project-local .hoard.toml instead of global config
        #[arg(long)]
        local: bool,
    },
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Parse the `general.log_format` config value; unknown values mean text
    pub fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}
