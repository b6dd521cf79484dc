//! mcpm CLI
//!
//! Installs MCP server packages, runs their install steps and merges their
//! launch configuration into IDE config files.

mod cli;
mod commands;
mod context;
mod error;
mod interactive;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::InstallArgs;
use context::Context;
use error::Result;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        tracing::debug!(stage = e.stage(), "command failed");
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug with `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("verbose mode enabled");
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} MCP package manager", "mcpm".green().bold());
            println!();
            println!("Run {} for available commands.", "mcpm --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::List { installed, search } => {
            let ctx = Context::load(true)?;
            commands::run_list(&ctx, installed, search.as_deref())
        }
        Commands::Install {
            package,
            release,
            inputs,
            non_interactive,
            yes,
            target,
        } => {
            let ctx = Context::load(non_interactive)?;
            commands::run_install(
                &ctx,
                InstallArgs {
                    package,
                    release,
                    inputs,
                    yes,
                    target,
                },
            )
        }
        Commands::Uninstall {
            name,
            keep_config,
            yes,
        } => {
            let ctx = Context::load(false)?;
            commands::run_uninstall(&ctx, &name, keep_config, yes)
        }
        Commands::Configure {
            package,
            target,
            action,
            non_interactive,
        } => {
            let ctx = Context::load(non_interactive)?;
            commands::run_configure(&ctx, package, target, action)
        }
        Commands::Create { output, source } => {
            commands::run_create(&source, output.as_deref(), context::can_prompt(false))
        }
        Commands::Publish { file } => {
            let ctx = Context::load(true)?;
            commands::run_publish(&ctx, &file)
        }
        Commands::Repair { name } => {
            let ctx = Context::load(true)?;
            commands::run_repair(&ctx, &name)
        }
        Commands::Targets => {
            let ctx = Context::load(true)?;
            commands::run_targets(&ctx)
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "mcpm", &mut std::io::stdout());
            Ok(())
        }
    }
}
