//! Uninstall command

use colored::Colorize;
use mcpm_core::UninstallOptions;

use crate::commands::{print_commands, print_outcomes, warn};
use crate::context::Context;
use crate::error::{CliError, Result};
use crate::interactive;

/// Run the uninstall command
pub fn run_uninstall(ctx: &Context, name: &str, keep_config: bool, yes: bool) -> Result<()> {
    let entry = ctx.manager.ledger().require(name)?;
    println!(
        "{} Uninstalling {} v{}",
        "=>".blue().bold(),
        entry.install_name.cyan(),
        entry.version
    );

    match ctx.manager.uninstall_preview(name) {
        Ok(commands) => print_commands("Uninstall steps", &commands),
        Err(e) => tracing::debug!(error = %e, "no uninstall preview"),
    }

    if !yes {
        if !ctx.is_interactive() {
            return Err(CliError::user(
                "Refusing to uninstall without confirmation; pass --yes",
            ));
        }
        if !interactive::confirm("Proceed?", false)? {
            return Err(CliError::user("Uninstall cancelled by user."));
        }
    }

    let report = ctx.manager.uninstall(
        name,
        &UninstallOptions {
            keep_ide_config: keep_config,
        },
    )?;

    print_outcomes(&report.execution.outcomes);
    for ide in &report.removed_from {
        println!("{} Removed from {} config", "OK".green().bold(), ide.cyan());
    }
    for warning in &report.warnings {
        warn(warning);
    }
    println!(
        "{} Uninstalled {}",
        "OK".green().bold(),
        report.entry.install_name.cyan()
    );
    Ok(())
}
