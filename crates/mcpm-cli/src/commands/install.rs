//! Install command
//!
//! Resolves the package source (local path or registry download), shows
//! what will run, then hands over to [`PackageManager`](mcpm_core::PackageManager).
//!
//! With `--target`, a name found in the registry's server catalog is not
//! installed at all: its launch entry is written straight into the IDE config.

use std::path::{Path, PathBuf};

use colored::Colorize;
use mcpm_core::{ConfigAction, InstallOptions, InstallSource, VersionChange, archive};
use mcpm_registry::ServerSummary;

use crate::commands::configure::configure_one;
use crate::commands::{print_commands, print_outcomes, warn};
use crate::context::Context;
use crate::error::{CliError, Result};
use crate::interactive::{self, TerminalPrompter};

/// Arguments of `mcpm install`
#[derive(Debug, Clone, Default)]
pub struct InstallArgs {
    pub package: String,
    pub release: String,
    pub inputs: Vec<(String, String)>,
    pub yes: bool,
    pub target: Option<String>,
}

/// Run the install command
pub fn run_install(ctx: &Context, args: InstallArgs) -> Result<()> {
    if let Some(ide) = args.target.as_deref()
        && !Path::new(&args.package).exists()
        && !looks_like_path(&args.package)
        && let Some(server) = catalog_server(ctx, &args.package)?
    {
        return configure_catalog_server(ctx, &server, ide);
    }

    let (source, downloaded) = resolve_source(ctx, &args.package, &args.release)?;
    let result = install_from(ctx, &source, &args);

    if let Some(path) = downloaded
        && let Err(e) = std::fs::remove_file(&path)
    {
        tracing::debug!(path = %path.display(), error = %e, "could not remove downloaded archive");
    }
    result
}

fn install_from(ctx: &Context, source: &InstallSource, args: &InstallArgs) -> Result<()> {
    let mut prompter = TerminalPrompter;
    let mut mode = ctx.input_mode(&mut prompter);
    let options = InstallOptions {
        provided: args.inputs.iter().cloned().collect(),
    };

    let plan = ctx.manager.plan_install(source, &options, &mut mode)?;
    let manifest = plan.manifest();

    println!(
        "{} Installing {} v{} ({}){}",
        "=>".blue().bold(),
        manifest.name.cyan(),
        manifest.version,
        manifest.install_name,
        describe_change(&plan.version_change()).dimmed()
    );
    let commands: Vec<String> = plan.steps().iter().map(|s| s.display().to_string()).collect();
    print_commands("Install steps", &commands);

    if !args.yes && ctx.is_interactive() && !interactive::confirm("Proceed?", true)? {
        return Err(CliError::user("Install cancelled by user."));
    }

    let report = ctx.manager.execute_install(plan)?;
    print_outcomes(&report.execution.outcomes);
    println!(
        "{} Installed {} v{} at {}",
        "OK".green().bold(),
        report.install_name.cyan(),
        report.version,
        report.install_path.display()
    );
    for name in &report.unsaved_secrets {
        warn(format!(
            "secret {name} was not stored ({} backend); it will be asked for again",
            ctx.settings().secret_backend.as_str()
        ));
    }

    let ide = match &args.target {
        Some(ide) => Some(ide.clone()),
        None => pick_ide_after_install(ctx, &report.supported_ides, args.yes)?,
    };
    match ide {
        Some(ide) => configure_one(
            ctx,
            &report.install_name,
            &ide,
            ConfigAction::Add,
            &report.inputs,
            &mut mode,
        ),
        None => {
            if !report.supported_ides.is_empty() {
                println!(
                    "Configure it with {} (supported: {})",
                    format!("mcpm configure --package {} --target <ide>", report.install_name).cyan(),
                    report.supported_ides.join(", ")
                );
            }
            Ok(())
        }
    }
}

/// Look `name` up in the server catalog. A catalog that cannot be read is
/// treated as not listing it.
fn catalog_server(ctx: &Context, name: &str) -> Result<Option<ServerSummary>> {
    let client = ctx.registry()?;
    match client.find_server(name) {
        Ok(server) => Ok(server),
        Err(e) => {
            tracing::debug!(server = name, error = %e, "server catalog lookup failed");
            Ok(None)
        }
    }
}

fn configure_catalog_server(ctx: &Context, server: &ServerSummary, ide: &str) -> Result<()> {
    println!(
        "{} Configuring server {} for {}",
        "=>".blue().bold(),
        server.registry_name.cyan(),
        ide.cyan()
    );
    let (key, block) = server.launch_entry()?;
    let report = ctx.manager.add_server_entry(ide, &key, &block)?;
    println!(
        "{} Added {} to {}",
        "OK".green().bold(),
        report.install_name.cyan(),
        report.config_path.display().to_string().dimmed()
    );
    Ok(())
}

/// Offer to configure an IDE right away when running interactively.
fn pick_ide_after_install(ctx: &Context, supported: &[String], yes: bool) -> Result<Option<String>> {
    let known = ctx.settings().known_targets();
    let choices: Vec<&String> = supported
        .iter()
        .filter(|ide| known.contains(&ide.as_str()))
        .collect();
    if yes || !ctx.is_interactive() || choices.is_empty() {
        return Ok(None);
    }
    if !interactive::confirm("Configure an IDE now?", true)? {
        return Ok(None);
    }
    let index = interactive::select("IDE", &choices)?;
    Ok(Some(choices[index].to_string()))
}

/// A local path is installed directly; anything else is a registry name.
fn resolve_source(ctx: &Context, package: &str, release: &str) -> Result<(InstallSource, Option<PathBuf>)> {
    let path = Path::new(package);
    if path.exists() {
        return Ok((InstallSource::from_path(path)?, None));
    }
    if looks_like_path(package) {
        return Err(CliError::user(format!("No such file or directory: {package}")));
    }

    let client = ctx.registry()?;
    println!(
        "{} Downloading {} ({}) from {}",
        "=>".blue().bold(),
        package.cyan(),
        release,
        client.base_url()
    );
    let archive = client.download(package, release, &ctx.settings().downloads_dir())?;
    Ok((InstallSource::Archive(archive.clone()), Some(archive)))
}

fn looks_like_path(package: &str) -> bool {
    package.contains('/')
        || package.contains('\\')
        || package.starts_with('.')
        || archive::is_archive(Path::new(package))
}

fn describe_change(change: &VersionChange) -> String {
    match change {
        VersionChange::Fresh => String::new(),
        other => format!(" [{other}]"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_like_arguments() {
        assert!(looks_like_path("./pkg"));
        assert!(looks_like_path("dist/pkg.zip"));
        assert!(looks_like_path("pkg.mcpz"));
        assert!(!looks_like_path("weather"));
        assert!(!looks_like_path("my-server"));
    }

    #[test]
    fn fresh_install_has_no_change_suffix() {
        assert_eq!(describe_change(&VersionChange::Fresh), "");
        assert!(describe_change(&VersionChange::Reinstall).starts_with(" ["));
    }
}
