//! Core install pipeline for mcpm
//!
//! A package is installed in stages:
//!
//! 1. the manifest is parsed ([`mcpm_meta::PackageManifest`]);
//! 2. inputs are resolved from explicit values, the [`ledger`], the
//!    [`secrets`] store and, last, prompts ([`inputs`]);
//! 3. install steps are substituted ([`substitute`]) and run ([`executor`]);
//! 4. the install is recorded in the [`ledger`].
//!
//! `configure` later substitutes the same values into the package's IDE block
//! and merges it into the IDE's config file ([`ide_config`]). [`manager`]
//! drives all of it.

pub mod archive;
pub mod config;
pub mod error;
pub mod executor;
pub mod ide_config;
pub mod inputs;
pub mod ledger;
pub mod manager;
pub mod secrets;
pub mod substitute;

pub use config::Settings;
pub use error::{Error, Result};
pub use executor::{ExecutionReport, StepOutcome, StepStatus};
pub use ide_config::ConfigAction;
pub use inputs::{InputMode, Prompter, ResolvedInputs};
pub use ledger::{Ledger, LedgerEntry};
pub use manager::{
    ConfigureReport, InstallOptions, InstallPlan, InstallReport, InstallSource, PackageManager,
    UninstallOptions, UninstallReport, VersionChange,
};
pub use secrets::{SecretBackend, SecretStore};
