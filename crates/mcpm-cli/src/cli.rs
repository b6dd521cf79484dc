//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use mcpm_core::ConfigAction;

/// mcpm - Install MCP server packages and wire them into your IDEs
#[derive(Parser, Debug)]
#[command(name = "mcpm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List registry packages, servers and installed packages
    ///
    /// Examples:
    ///   mcpm list                  # Registry and local packages
    ///   mcpm list --installed      # Only what is installed here
    ///   mcpm list --search weather # Filter by name or description
    List {
        /// Only show locally installed packages
        #[arg(long)]
        installed: bool,

        /// Case-insensitive filter on name and description
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Install a package from the registry, an archive, or a directory
    ///
    /// Examples:
    ///   mcpm install weather                       # Latest from the registry
    ///   mcpm install weather --version 1.2.0
    ///   mcpm install ./my-server-1.0.0.zip
    ///   mcpm install ./my-server --input API_KEY=abc --non-interactive
    ///   mcpm install weather --target cursor       # Also configure Cursor
    ///   mcpm install github --target windsurf      # Catalog server: config only
    Install {
        /// Registry package name, or path to an archive or directory
        package: String,

        /// Registry version to install
        #[arg(long = "version", value_name = "VERSION", default_value = "latest")]
        release: String,

        /// Input value, repeatable
        #[arg(short, long = "input", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        inputs: Vec<(String, String)>,

        /// Fail instead of prompting for missing inputs
        #[arg(long)]
        non_interactive: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Configure this IDE after installing; for a catalog server, only
        /// write its entry
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Uninstall a package and remove it from IDE configs
    Uninstall {
        /// Install name of the package
        name: String,

        /// Leave the package's entries in IDE config files
        #[arg(long)]
        keep_config: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Add or remove an installed package in an IDE's MCP config
    ///
    /// Examples:
    ///   mcpm configure --package weather --target windsurf
    ///   mcpm configure --package weather --target cursor --action remove
    Configure {
        /// Install name of the package
        #[arg(short, long)]
        package: Option<String>,

        /// IDE target (see 'mcpm targets')
        #[arg(short, long)]
        target: Option<String>,

        /// What to do with the entry
        #[arg(short, long, value_enum)]
        action: Option<ActionArg>,

        /// Fail instead of prompting
        #[arg(long)]
        non_interactive: bool,
    },

    /// Build a package archive from a directory
    Create {
        /// Archive to write (default: <name>-<version>.zip in the source dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Package directory
        #[arg(short, long, default_value = ".")]
        source: PathBuf,
    },

    /// Upload a package archive to the registry
    Publish {
        /// Archive to publish
        file: PathBuf,
    },

    /// Re-record a package that is on disk but missing from the ledger
    Repair {
        /// Install name (directory under the packages dir)
        name: String,
    },

    /// Show known IDE targets and their config files
    Targets,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// `--action` values
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArg {
    Add,
    Remove,
}

impl From<ActionArg> for ConfigAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Add => ConfigAction::Add,
            ActionArg::Remove => ConfigAction::Remove,
        }
    }
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_no_args() {
        let cli = Cli::parse_from(["mcpm"]);
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parse_install_with_inputs() {
        let cli = Cli::parse_from([
            "mcpm",
            "install",
            "./pkg.zip",
            "--input",
            "API_KEY=a=b",
            "-i",
            "REGION=eu",
            "--non-interactive",
        ]);
        match cli.command {
            Some(Commands::Install {
                package,
                release,
                inputs,
                non_interactive,
                yes,
                target,
            }) => {
                assert_eq!(package, "./pkg.zip");
                assert_eq!(release, "latest");
                assert_eq!(
                    inputs,
                    vec![
                        ("API_KEY".to_string(), "a=b".to_string()),
                        ("REGION".to_string(), "eu".to_string()),
                    ]
                );
                assert!(non_interactive);
                assert!(!yes);
                assert!(target.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(Cli::try_parse_from(["mcpm", "install", "x", "--input", "NOEQUALS"]).is_err());
        assert!(Cli::try_parse_from(["mcpm", "install", "x", "--input", "=v"]).is_err());
    }

    #[test]
    fn parse_configure_action() {
        let cli = Cli::parse_from([
            "mcpm", "configure", "-p", "weather", "-t", "cursor", "--action", "remove",
        ]);
        assert!(matches!(
            cli.command,
            Some(Commands::Configure {
                action: Some(ActionArg::Remove),
                ..
            })
        ));
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["mcpm", "completions", "bash"]);
        assert!(matches!(cli.command, Some(Commands::Completions { .. })));
    }
}
