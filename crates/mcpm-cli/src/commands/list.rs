//! List registry and installed packages

use std::collections::BTreeSet;

use colored::Colorize;
use mcpm_core::LedgerEntry;
use mcpm_meta::derive_install_name;
use mcpm_registry::PackageSummary;

use crate::commands::warn;
use crate::context::Context;
use crate::error::Result;

const MAX_DESCRIPTION: usize = 50;

/// Run the list command
pub fn run_list(ctx: &Context, installed_only: bool, search: Option<&str>) -> Result<()> {
    let installed: Vec<LedgerEntry> = ctx
        .manager
        .installed()?
        .into_iter()
        .filter(|entry| search.is_none_or(|term| contains_ci(&entry.install_name, term)))
        .collect();

    if installed_only {
        print_installed(&installed);
        return Ok(());
    }

    let registry = ctx.registry()?;
    let mut in_registry = BTreeSet::new();

    println!("{}", "Registry Packages".bold());
    match registry.list_packages() {
        Ok(packages) => {
            let packages: Vec<PackageSummary> = packages
                .into_iter()
                .filter(|p| search.is_none_or(|term| p.matches(term)))
                .collect();
            if packages.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for package in &packages {
                let install_name = package
                    .install_name
                    .clone()
                    .unwrap_or_else(|| derive_install_name(&package.name));
                let local = installed.iter().find(|e| e.install_name == install_name);
                print_registry_row(package, local);
                in_registry.insert(install_name);
            }
        }
        Err(e) => warn(format!("registry unavailable at {}: {e}", registry.base_url())),
    }
    println!();

    let local_only: Vec<LedgerEntry> = installed
        .into_iter()
        .filter(|e| !in_registry.contains(&e.install_name))
        .collect();
    if !local_only.is_empty() {
        println!("{}", "Local-only Packages".bold());
        for entry in &local_only {
            print_entry(entry);
        }
        println!();
    }

    println!("{}", "Servers".bold());
    match registry.list_servers() {
        Ok(servers) => {
            let servers: Vec<_> = servers
                .into_iter()
                .filter(|s| {
                    search.is_none_or(|term| {
                        contains_ci(&s.registry_name, term)
                            || contains_ci(&s.name, term)
                            || s.description.as_deref().is_some_and(|d| contains_ci(d, term))
                    })
                })
                .collect();
            if servers.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for server in servers {
                println!(
                    "  {:<24} {}",
                    server.registry_name.green(),
                    truncate(server.description.as_deref().unwrap_or(&server.name))
                );
            }
        }
        Err(e) => warn(format!("could not fetch server catalog: {e}")),
    }

    Ok(())
}

fn print_installed(installed: &[LedgerEntry]) {
    println!("{}", "Installed Packages".bold());
    if installed.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }
    for entry in installed {
        print_entry(entry);
    }
}

fn print_entry(entry: &LedgerEntry) {
    println!(
        "  {:<24} v{:<10} {}",
        entry.install_name.green(),
        entry.version,
        entry.install_path.display().to_string().dimmed()
    );
}

fn print_registry_row(package: &PackageSummary, local: Option<&LedgerEntry>) {
    let marker = if local.is_some() { "*".green().bold() } else { "-".dimmed() };
    let mut line = format!("  {} {} (v{})", marker, package.name, package.latest_version);
    if let Some(entry) = local
        && entry.version != package.latest_version
    {
        line.push_str(&format!(" [installed: v{}]", entry.version));
    }
    if let Some(description) = package.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!(" - {}", truncate(description)));
    }
    println!("{line}");
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_DESCRIPTION {
        let head: String = text.chars().take(MAX_DESCRIPTION).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_long_descriptions() {
        assert_eq!(truncate("short"), "short");
        let long = "x".repeat(60);
        assert_eq!(truncate(&long), format!("{}...", "x".repeat(50)));
    }

    #[test]
    fn case_insensitive_search() {
        assert!(contains_ci("Weather-Tool", "weather"));
        assert!(!contains_ci("github", "slack"));
    }
}
