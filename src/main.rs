//! Hoard - workspace build-artifact cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use hoard::cli::args::LogFormat;
use hoard::cli::{commands, Cli, Commands};
use hoard::config::ConfigManager;
use hoard::error::{HoardError, HoardResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> HoardResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd =
            std::env::current_dir().map_err(|e| HoardError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    let log_format = cli
        .log_format
        .unwrap_or_else(|| LogFormat::from_config(&config.general.log_format));
    init_logging(cli.verbose, log_format);

    debug!("Using config {}", config_manager.path().display());
    match &local_config_path {
        Some(path) => debug!("Found local config: {}", path.display()),
        None if cli.no_local => debug!("Local config discovery disabled (--no-local)"),
        None => {}
    }

    // Dispatch to command
    match cli.command {
        Commands::Key(args) => commands::key(args, &config).await,
        Commands::Changes(args) => commands::changes(args, &config).await,
        Commands::Restore(args) => commands::restore(args, &config).await,
        Commands::Save(args) => commands::save(args, &config).await,
        Commands::Clean(args) => commands::clean(args, &config).await,
        Commands::List(args) => commands::list(args, &config).await,
        Commands::Clear(args) => commands::clear(args, &config).await,
        Commands::Env(args) => commands::env(args, &config).await,
        Commands::InstallCmd(args) => commands::install_cmd(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
    }
}

/// Initialize logging: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => EnvFilter::new("hoard=warn"),
        1 => EnvFilter::new("hoard=info"),
        _ => EnvFilter::new("hoard=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.without_time().init(),
    }
}
