//! List command - show cache entries

use crate::cache::{format_bytes, EntryMetadata};
use crate::cli::args::{ListArgs, OutputFormat};
use crate::cli::commands::cache_manager;
use crate::config::Config;
use crate::error::HoardResult;
use chrono::{DateTime, Utc};
use console::style;

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;
    let entries = manager.list_entries()?;

    if entries.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No cache entries found."),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.key);
            }
        }
    }

    Ok(())
}

fn print_table(entries: &[EntryMetadata]) {
    println!(
        "{:<40} {:<24} {:<10} {:<17} {}",
        style("KEY").bold(),
        style("WORKSPACE").bold(),
        style("SIZE").bold(),
        style("SAVED").bold(),
        style("ARTIFACTS").bold()
    );
    println!("{}", "-".repeat(110));

    for entry in entries {
        println!(
            "{:<40} {:<24} {:<10} {:<17} {}",
            entry.key,
            entry.workspace,
            format_bytes(entry.size),
            saved_at(entry.timestamp),
            entry.artifacts.join(",")
        );
    }

    let total: u64 = entries.iter().map(|e| e.size).sum();
    println!();
    println!(
        "Total: {} entr{}, {}",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        format_bytes(total)
    );
}

fn saved_at(timestamp_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
