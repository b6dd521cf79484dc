//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for terminal-based input and selection.

use dialoguer::{Confirm, Input, Password, Select};
use mcpm_core::Prompter;
use mcpm_meta::InputSpec;
use serde_json::{Value, json};

use crate::error::Result;

/// Asks for package inputs on the terminal. Secret inputs are not echoed.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&mut self, spec: &InputSpec) -> mcpm_core::Result<String> {
        let prompt = spec.prompt_text();
        let answer = if spec.secret {
            Password::new()
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()
        } else {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        };
        answer.map_err(|e| {
            tracing::debug!(input = %spec.name, error = %e, "prompt aborted");
            mcpm_core::Error::Cancelled
        })
    }
}

pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// Pick one of `items`; returns its index.
pub fn select<T: ToString>(prompt: &str, items: &[T]) -> Result<usize> {
    Ok(Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()?)
}

const RUNTIMES: &[&str] = &["node", "python", "generic"];

/// Ask for the basics of a new `mcp_package.json`.
pub fn scaffold_manifest(default_name: &str) -> Result<Value> {
    println!();
    let name: String = Input::new()
        .with_prompt("Package name")
        .default(default_name.to_string())
        .interact_text()?;
    let version: String = Input::new()
        .with_prompt("Version")
        .default("1.0.0".to_string())
        .interact_text()?;
    let description: String = Input::new()
        .with_prompt("Description")
        .allow_empty(true)
        .interact_text()?;
    let author: String = Input::new()
        .with_prompt("Author")
        .allow_empty(true)
        .interact_text()?;
    let license: String = Input::new()
        .with_prompt("License")
        .default("MIT".to_string())
        .interact_text()?;
    let runtime = RUNTIMES[select("Runtime", RUNTIMES)?];

    Ok(manifest_skeleton(&name, &version, &description, &author, &license, runtime))
}

fn manifest_skeleton(
    name: &str,
    version: &str,
    description: &str,
    author: &str,
    license: &str,
    runtime: &str,
) -> Value {
    json!({
        "name": name,
        "version": version,
        "description": description,
        "author": author,
        "license": license,
        "runtime": runtime,
        "install_inputs": [],
        "install_steps": [],
        "uninstall_steps": [],
        "ide_config_commands": {}
    })
}
