//! Create command: build a package archive from a directory

use std::path::Path;

use colored::Colorize;
use mcpm_core::{PackageManager, ResolvedInputs, archive};
use mcpm_meta::{MANIFEST_FILENAME, PackageManifest};

use crate::commands::print_commands;
use crate::error::{CliError, Result};
use crate::interactive;

/// Run the create command
///
/// Scaffolds `mcp_package.json` first when it is missing and prompts are
/// possible.
pub fn run_create(source: &Path, output: Option<&Path>, can_prompt: bool) -> Result<()> {
    if !source.is_dir() {
        return Err(CliError::user(format!(
            "Source directory not found: {}",
            source.display()
        )));
    }

    let manifest_path = source.join(MANIFEST_FILENAME);
    if !manifest_path.exists() {
        if !can_prompt {
            return Err(CliError::user(format!(
                "No {MANIFEST_FILENAME} in {}; run interactively to scaffold one",
                source.display()
            )));
        }
        println!(
            "{} No {} found, let's create one",
            "=>".blue().bold(),
            MANIFEST_FILENAME
        );
        let default_name = suggested_name(source);
        let skeleton = interactive::scaffold_manifest(&default_name)?;
        std::fs::write(&manifest_path, serde_json::to_string_pretty(&skeleton)? + "\n")?;
        println!("{} Wrote {}", "OK".green().bold(), manifest_path.display());
    }

    let manifest = PackageManifest::from_dir(source)?;
    let output = match output {
        Some(path) => path.to_path_buf(),
        None => source.join(archive::default_archive_name(&manifest)),
    };

    println!(
        "{} Packaging {} v{}",
        "=>".blue().bold(),
        manifest.name.cyan(),
        manifest.version
    );
    let summary = archive::create(source, &output)?;
    println!(
        "{} Created {} ({} files)",
        "OK".green().bold(),
        summary.path.display(),
        summary.files
    );
    print_commands(
        "Install steps",
        &PackageManager::preview_steps(&manifest, &ResolvedInputs::new()),
    );
    Ok(())
}

/// Directory name to suggest as the package name.
fn suggested_name(source: &Path) -> String {
    source
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "my-package".to_string())
}
