//! Clear command - remove every cache entry, optionally with lock markers

use crate::cli::args::ClearArgs;
use crate::cli::commands::cache_manager;
use crate::config::Config;
use crate::error::HoardResult;
use console::style;
use std::io::{self, Write};

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> HoardResult<()> {
    let manager = cache_manager(config)?;
    let entries = manager.list_entries()?;
    let cache_root = &manager.settings().cache_root;

    if !cache_root.exists() {
        println!("No cache entries to clear.");
        return Ok(());
    }

    println!(
        "This will remove {} cache entr{} from {}",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        cache_root.display()
    );
    if args.locks {
        println!("Lock markers will be removed too; make sure no save is running.");
    }

    if !args.yes {
        print!("Are you sure? [y/N] ");
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            println!("Failed to read input, aborting.");
            return Ok(());
        }

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let removed = manager.clear_cache()?;
    println!("{} cleared {} cache item(s)", style("✓").green(), removed);

    if args.locks {
        let locks = manager.clear_locks()?;
        println!("{} removed {} lock marker(s)", style("✓").green(), locks);
    }

    Ok(())
}
