//! Targets command: list known IDE config files

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Run the targets command
pub fn run_targets(ctx: &Context) -> Result<()> {
    println!("{}", "IDE Targets".bold());
    for (ide, path) in &ctx.settings().targets {
        let state = if path.exists() {
            "present".green()
        } else {
            "not created yet".dimmed()
        };
        println!("  {:<16} {} ({})", ide.cyan(), path.display(), state);
    }
    println!();
    println!(
        "{} Add or override targets under [targets] in {}",
        "Tip:".dimmed(),
        ctx.settings().config_path().display()
    );
    Ok(())
}
