//! Configure command: add or remove a package's entry in an IDE config

use colored::Colorize;
use mcpm_core::{ConfigAction, InputMode, ResolvedInputs};

use crate::cli::ActionArg;
use crate::context::Context;
use crate::error::{CliError, Result};
use crate::interactive::{self, TerminalPrompter};

/// Run the configure command, asking for whatever was not given when
/// interactive.
pub fn run_configure(
    ctx: &Context,
    package: Option<String>,
    target: Option<String>,
    action: Option<ActionArg>,
) -> Result<()> {
    let package = match package {
        Some(package) => package,
        None => pick_package(ctx)?,
    };
    let action = match action {
        Some(action) => ConfigAction::from(action),
        None if ctx.is_interactive() => {
            let actions = [ConfigAction::Add, ConfigAction::Remove];
            actions[interactive::select("Action", &actions)?]
        }
        None => ConfigAction::Add,
    };
    let target = match target {
        Some(target) => target,
        None => pick_target(ctx, &package)?,
    };

    let mut prompter = TerminalPrompter;
    let mut mode = ctx.input_mode(&mut prompter);
    configure_one(ctx, &package, &target, action, &ResolvedInputs::new(), &mut mode)
}

/// Apply one action and report it. `values` override remembered inputs.
pub(crate) fn configure_one(
    ctx: &Context,
    install_name: &str,
    ide: &str,
    action: ConfigAction,
    values: &ResolvedInputs,
    mode: &mut InputMode<'_>,
) -> Result<()> {
    println!(
        "{} Configuring {} for {} ({})",
        "=>".blue().bold(),
        install_name.cyan(),
        ide.cyan(),
        action
    );
    let report = ctx
        .manager
        .configure_with(install_name, ide, action, values, mode)?;
    let path = report.config_path.display().to_string();

    match (report.action, report.changed) {
        (ConfigAction::Add, _) => println!(
            "{} Added {} to {}",
            "OK".green().bold(),
            report.install_name.cyan(),
            path.dimmed()
        ),
        (ConfigAction::Remove, true) => println!(
            "{} Removed {} from {}",
            "OK".green().bold(),
            report.install_name.cyan(),
            path.dimmed()
        ),
        (ConfigAction::Remove, false) => println!(
            "{} {} was not configured in {}; nothing to do",
            "OK".green().bold(),
            report.install_name.cyan(),
            path.dimmed()
        ),
    }
    Ok(())
}

fn pick_package(ctx: &Context) -> Result<String> {
    if !ctx.is_interactive() {
        return Err(CliError::user("--package is required when not running interactively"));
    }
    let names: Vec<String> = ctx
        .manager
        .installed()?
        .into_iter()
        .map(|entry| entry.install_name)
        .collect();
    if names.is_empty() {
        return Err(CliError::user("No packages installed."));
    }
    Ok(names[interactive::select("Package", &names)?].clone())
}

/// Targets the package declares that are also known IDEs.
fn pick_target(ctx: &Context, package: &str) -> Result<String> {
    let (_, manifest) = ctx.manager.manifest_of(package)?;
    let known = ctx.settings().known_targets();
    let choices: Vec<&str> = manifest
        .supported_ides()
        .into_iter()
        .filter(|ide| known.contains(ide))
        .collect();

    if !ctx.is_interactive() {
        return Err(CliError::user(format!(
            "--target is required when not running interactively (supported by {package}: {})",
            if choices.is_empty() { "none".to_string() } else { choices.join(", ") }
        )));
    }
    if choices.is_empty() {
        return Err(CliError::user(format!(
            "{package} declares no configuration for any known IDE target"
        )));
    }
    Ok(choices[interactive::select("IDE", &choices)?].to_string())
}
