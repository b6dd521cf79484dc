//! Publish command

use std::path::Path;

use colored::Colorize;
use mcpm_core::archive;
use mcpm_registry::PublishMetadata;

use crate::context::Context;
use crate::error::{CliError, Result};

/// Run the publish command
pub fn run_publish(ctx: &Context, file: &Path) -> Result<()> {
    if !file.is_file() {
        return Err(CliError::user(format!("Package file not found: {}", file.display())));
    }

    let manifest = archive::read_manifest(file)?;
    let metadata = PublishMetadata::from(&manifest);
    let client = ctx.registry()?;

    println!(
        "{} Publishing {} (v{}) to {}",
        "=>".blue().bold(),
        metadata.name.cyan(),
        metadata.version,
        client.base_url()
    );
    let response = client.publish(file, &metadata)?;

    let message = if response.message.is_empty() {
        format!("Published {} v{}", response.name, response.version)
    } else {
        response.message
    };
    println!("{} {}", "OK".green().bold(), message);
    Ok(())
}
