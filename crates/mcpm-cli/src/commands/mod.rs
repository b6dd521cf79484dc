//! Command implementations for mcpm-cli

pub mod configure;
pub mod create;
pub mod install;
pub mod list;
pub mod publish;
pub mod repair;
pub mod targets;
pub mod uninstall;

pub use configure::run_configure;
pub use create::run_create;
pub use install::{InstallArgs, run_install};
pub use list::run_list;
pub use publish::run_publish;
pub use repair::run_repair;
pub use targets::run_targets;
pub use uninstall::run_uninstall;

use colored::Colorize;
use mcpm_core::{StepOutcome, StepStatus};

/// Print one line per step outcome, with failure output indented below.
pub(crate) fn print_outcomes(outcomes: &[StepOutcome]) {
    for outcome in outcomes {
        let tag = match outcome.status {
            StepStatus::Succeeded => "OK".green().bold(),
            StepStatus::Failed { .. } => "FAIL".red().bold(),
            StepStatus::NotRun => "SKIP".dimmed(),
        };
        println!("  {} {}. {}", tag, outcome.index + 1, outcome.command);
        if matches!(outcome.status, StepStatus::Failed { .. }) {
            for line in outcome.output.lines() {
                println!("      {}", line.dimmed());
            }
        }
    }
}

/// Numbered command listing used before running steps.
pub(crate) fn print_commands(title: &str, commands: &[String]) {
    if commands.is_empty() {
        return;
    }
    println!("  {}:", title.dimmed());
    for (i, command) in commands.iter().enumerate() {
        println!("    {}. {}", i + 1, command.cyan());
    }
}

pub(crate) fn warn(message: impl std::fmt::Display) {
    eprintln!("{} {}", "WARN".yellow().bold(), message);
}
