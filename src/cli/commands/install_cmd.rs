//! Install-cmd command - print the scoped install command for a workspace

use crate::cli::args::{InstallCmdArgs, OutputFormat};
use crate::cli::commands::cache_manager;
use crate::config::Config;
use crate::error::HoardResult;

/// Execute the install-cmd command
pub async fn execute(args: InstallCmdArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;
    let command = manager.scoped_install_command(&args.workspace);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&command)?),
        OutputFormat::Plain | OutputFormat::Table => println!("{}", command),
    }

    Ok(())
}
