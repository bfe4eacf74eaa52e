//! Env command - show the environment a workspace build receives

use crate::cli::args::{EnvArgs, OutputFormat};
use crate::cli::commands::cache_manager;
use crate::config::Config;
use crate::env::EnvironmentReport;
use crate::error::HoardResult;
use console::style;

/// Execute the env command
pub async fn execute(args: EnvArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;

    if args.check {
        let report = manager.check_workspace_environment(&args.workspace);
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            _ => print_report(&args.workspace, &report),
        }
        return Ok(());
    }

    let vars = manager.validate_workspace_environment(&args.workspace);

    match args.format {
        // Values are secrets; JSON is for tooling that passes them on.
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&vars)?),
        OutputFormat::Plain | OutputFormat::Table if args.names_only => {
            for name in vars.keys() {
                println!("{}", name);
            }
        }
        OutputFormat::Plain => {
            for (name, value) in &vars {
                println!("{}={}", name, value);
            }
        }
        OutputFormat::Table => {
            for name in vars.keys() {
                println!("  {} {}", style("•").cyan(), name);
            }
            println!();
            println!("{} variable(s) for {}", vars.len(), args.workspace);
        }
    }

    Ok(())
}

fn print_report(workspace: &str, report: &EnvironmentReport) {
    if let Some(kind) = report.kind {
        println!("Workspace {} ({})", style(workspace).cyan(), kind);
    }

    for warning in &report.warnings {
        println!("  {} {}", style("!").yellow(), warning);
    }
    for error in &report.errors {
        println!("  {} {}", style("✗").red(), error);
    }

    if report.is_valid() {
        println!("{} Environment OK", style("✓").green());
    } else {
        println!(
            "{} {} environment error(s)",
            style("✗").red(),
            report.errors.len()
        );
    }
}
