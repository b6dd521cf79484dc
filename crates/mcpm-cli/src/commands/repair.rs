//! Repair command

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Run the repair command
pub fn run_repair(ctx: &Context, name: &str) -> Result<()> {
    println!("{} Repairing ledger entry for {}", "=>".blue().bold(), name.cyan());
    let entry = ctx.manager.repair(name)?;
    println!(
        "{} Recorded {} v{} at {}",
        "OK".green().bold(),
        entry.install_name.cyan(),
        entry.version,
        entry.install_path.display()
    );
    if entry.inputs.is_empty() && entry.secret_inputs.is_empty() {
        println!(
            "{}",
            "Input values are not recoverable; 'mcpm configure' will ask for them again.".dimmed()
        );
    }
    Ok(())
}
