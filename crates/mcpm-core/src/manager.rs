//! Install, uninstall and configure pipeline
//!
//! [`PackageManager`] ties the pieces together: it stages a package, parses
//! its manifest, resolves inputs, runs steps, keeps the ledger and the secret
//! store up to date, and merges IDE config.
//!
//! Installing is split into [`PackageManager::plan_install`], which does
//! every check that can fail without side effects, and
//! [`PackageManager::execute_install`], which moves the package into place
//! and runs its steps. Callers can show the plan and ask for confirmation in
//! between.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use mcpm_fs::{checksum, io};
use mcpm_meta::{FallbackHint, MANIFEST_FILENAME, PackageManifest};
use semver::Version;
use serde_json::Value;
use tempfile::TempDir;

use crate::archive;
use crate::config::Settings;
use crate::executor::{self, ExecutionReport, PreparedStep};
use crate::ide_config::{self, ConfigAction, IdeConfigFile};
use crate::inputs::{self, InputMode, ResolvedInputs};
use crate::ledger::{Ledger, LedgerEntry};
use crate::secrets::SecretStore;
use crate::substitute::substitute_value;
use crate::{Error, Result};

/// Where a package is installed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    /// A `.zip` / `.mcpz` package archive.
    Archive(PathBuf),
    /// An unpacked package directory.
    Directory(PathBuf),
}

impl InstallSource {
    /// Classify an existing path.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path).map_err(|e| mcpm_fs::Error::io(&path, e))?;
        if metadata.is_dir() {
            Ok(Self::Directory(path))
        } else {
            Ok(Self::Archive(path))
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Archive(p) | Self::Directory(p) => p,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Values given up front; these beat stored values and prompts.
    pub provided: BTreeMap<String, String>,
}

/// How an install relates to what the ledger already had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionChange {
    Fresh,
    Reinstall,
    Upgrade { from: String },
    Downgrade { from: String },
    /// Versions differ but are not both semver.
    Changed { from: String },
}

impl VersionChange {
    pub fn between(previous: Option<&str>, next: &str) -> Self {
        let Some(previous) = previous else {
            return Self::Fresh;
        };
        if previous == next {
            return Self::Reinstall;
        }
        let from = previous.to_string();
        match (Version::parse(previous), Version::parse(next)) {
            (Ok(old), Ok(new)) if new > old => Self::Upgrade { from },
            (Ok(old), Ok(new)) if new < old => Self::Downgrade { from },
            (Ok(_), Ok(_)) => Self::Reinstall,
            _ => Self::Changed { from },
        }
    }
}

impl fmt::Display for VersionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fresh => write!(f, "new install"),
            Self::Reinstall => write!(f, "reinstall"),
            Self::Upgrade { from } => write!(f, "upgrade from {from}"),
            Self::Downgrade { from } => write!(f, "downgrade from {from}"),
            Self::Changed { from } => write!(f, "replacing {from}"),
        }
    }
}

/// A validated install, ready to execute.
///
/// Holds the staged package files; dropping the plan discards them.
#[derive(Debug)]
pub struct InstallPlan {
    _staging: TempDir,
    package_root: PathBuf,
    manifest: PackageManifest,
    inputs: ResolvedInputs,
    steps: Vec<PreparedStep>,
    previous: Option<LedgerEntry>,
    checksum: Option<String>,
}

impl InstallPlan {
    pub fn manifest(&self) -> &PackageManifest {
        &self.manifest
    }

    pub fn inputs(&self) -> &ResolvedInputs {
        &self.inputs
    }

    pub fn steps(&self) -> &[PreparedStep] {
        &self.steps
    }

    pub fn previous(&self) -> Option<&LedgerEntry> {
        self.previous.as_ref()
    }

    pub fn version_change(&self) -> VersionChange {
        VersionChange::between(
            self.previous.as_ref().map(|e| e.version.as_str()),
            &self.manifest.version,
        )
    }
}

#[derive(Debug)]
pub struct InstallReport {
    pub install_name: String,
    pub name: String,
    pub version: String,
    pub install_path: PathBuf,
    pub change: VersionChange,
    pub execution: ExecutionReport,
    /// IDEs the package declares a config block for.
    pub supported_ides: Vec<String>,
    /// Secret inputs the secret store refused; they will be asked for again.
    pub unsaved_secrets: Vec<String>,
    /// Values the steps ran with. Lets a follow-up `configure` reuse secrets
    /// that could not be stored.
    pub inputs: ResolvedInputs,
}

#[derive(Debug, Clone, Default)]
pub struct UninstallOptions {
    /// Leave the package's entries in IDE config files alone.
    pub keep_ide_config: bool,
}

#[derive(Debug)]
pub struct UninstallReport {
    pub entry: LedgerEntry,
    pub execution: ExecutionReport,
    /// IDE targets the package's block was removed from.
    pub removed_from: Vec<String>,
    /// Non-fatal problems met while cleaning up.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureReport {
    pub install_name: String,
    pub ide: String,
    pub config_path: PathBuf,
    pub action: ConfigAction,
    /// False when `Remove` found nothing to remove.
    pub changed: bool,
}

/// The install pipeline over one mcpm home.
pub struct PackageManager {
    settings: Settings,
    ledger: Ledger,
    secrets: Box<dyn SecretStore>,
}

impl PackageManager {
    pub fn new(settings: Settings, secrets: Box<dyn SecretStore>) -> Self {
        let ledger = Ledger::open(settings.ledger_path());
        Self {
            settings,
            ledger,
            secrets,
        }
    }

    /// Use the secret backend named in `settings`.
    pub fn from_settings(settings: Settings) -> Self {
        let secrets = settings.secret_backend.open();
        Self::new(settings, secrets)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn installed(&self) -> Result<Vec<LedgerEntry>> {
        self.ledger.list()
    }

    /// Commands `manifest` would run on install, for display.
    ///
    /// Placeholders without a value stay visible instead of failing.
    pub fn preview_steps(manifest: &PackageManifest, values: &ResolvedInputs) -> Vec<String> {
        executor::preview(&manifest.install_steps, values)
    }

    /// Values remembered for an installed package: plain values from the
    /// ledger plus whatever the secret store still has.
    pub fn stored_inputs(&self, entry: &LedgerEntry) -> ResolvedInputs {
        let mut values = entry.stored_inputs();
        for name in &entry.secret_inputs {
            match self.secrets.get(&entry.install_name, name) {
                Ok(Some(value)) => values.insert_secret(name, value),
                Ok(None) => {
                    tracing::debug!(package = %entry.install_name, input = %name, "secret not in store")
                }
                Err(e) => {
                    tracing::warn!(package = %entry.install_name, input = %name, error = %e, "could not read secret")
                }
            }
        }
        values
    }

    /// Ledger entry and manifest of an installed package.
    pub fn manifest_of(&self, install_name: &str) -> Result<(LedgerEntry, PackageManifest)> {
        let entry = self.ledger.require(install_name)?;
        let manifest = installed_manifest(&entry)?;
        Ok((entry, manifest))
    }

    // -----------------------------------------------------------------------
    // Install
    // -----------------------------------------------------------------------

    /// Stage `source` and validate everything needed to install it.
    ///
    /// Nothing outside the staging directory is touched. Fails on a bad
    /// manifest, an unsupported step type, a missing input, or a step
    /// referencing an unknown variable.
    pub fn plan_install(
        &self,
        source: &InstallSource,
        options: &InstallOptions,
        mode: &mut InputMode<'_>,
    ) -> Result<InstallPlan> {
        let packages_dir = self.settings.packages_dir();
        fs::create_dir_all(&packages_dir).map_err(|e| mcpm_fs::Error::io(&packages_dir, e))?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&packages_dir)
            .map_err(|e| mcpm_fs::Error::io(&packages_dir, e))?;

        let (package_root, checksum) = match source {
            InstallSource::Archive(path) => {
                let checksum = checksum::compute_file_checksum(path)?;
                (archive::extract(path, staging.path())?, Some(checksum))
            }
            InstallSource::Directory(path) => {
                let root = staging.path().join("package");
                archive::copy_tree(path, &root)?;
                (root, None)
            }
        };

        let hint = FallbackHint::from_path(source.path());
        let manifest = match io::read_optional(&package_root.join(MANIFEST_FILENAME))? {
            Some(raw) => PackageManifest::parse_with_fallback(&raw, &hint)?,
            None => {
                tracing::warn!(source = %source.path().display(), "package has no {MANIFEST_FILENAME}; using name and version from its file name");
                PackageManifest::parse_with_fallback("{}", &hint)?
            }
        };
        tracing::info!(package = %manifest.install_name, version = %manifest.version, "staged package");

        let previous = self.ledger.lookup(&manifest.install_name)?;
        let mut known = previous
            .as_ref()
            .map(|entry| self.stored_inputs(entry))
            .unwrap_or_default();
        for (name, value) in &options.provided {
            if manifest.install_inputs.iter().any(|i| &i.name == name) {
                known.insert(name, value);
            } else {
                tracing::warn!(input = %name, "ignoring value for input the package does not declare");
            }
        }

        let inputs = inputs::resolve(&manifest.install_inputs, &known, mode)?;
        let steps = executor::prepare(&manifest.install_steps, &inputs)?;

        Ok(InstallPlan {
            _staging: staging,
            package_root,
            manifest,
            inputs,
            steps,
            previous,
            checksum,
        })
    }

    /// Move the staged package into place, run its steps and record it.
    ///
    /// A failing step leaves the package directory in place and the ledger
    /// untouched. If the steps succeed but the ledger cannot be written the
    /// result is [`Error::LedgerOutOfSync`]; `repair` fixes that state.
    pub fn execute_install(&self, plan: InstallPlan) -> Result<InstallReport> {
        let install_name = plan.manifest.install_name.clone();
        let target = self.settings.package_dir(&install_name);

        if target.exists() {
            tracing::info!(path = %target.display(), "replacing existing package directory");
            fs::remove_dir_all(&target).map_err(|e| mcpm_fs::Error::io(&target, e))?;
        }
        fs::rename(&plan.package_root, &target).map_err(|e| mcpm_fs::Error::io(&target, e))?;

        let execution =
            executor::run_prepared(&plan.steps, &target, &plan.inputs)?.ensure_success()?;

        let unsaved_secrets = self.save_secrets(&install_name, &plan.inputs);
        let mut entry = LedgerEntry::new(&install_name, &plan.manifest.version, &target)
            .with_inputs(&plan.inputs)
            .with_checksum(plan.checksum.clone());
        entry.secret_inputs.retain(|name| !unsaved_secrets.contains(name));
        if let Some(previous) = &plan.previous {
            self.forget_secrets(previous, &entry.secret_inputs);
        }

        self.ledger
            .record(entry)
            .map_err(|source| Error::LedgerOutOfSync {
                install_name: install_name.clone(),
                source: Box::new(source),
            })?;

        let change = plan.version_change();
        tracing::info!(package = %install_name, version = %plan.manifest.version, %change, "installed");
        Ok(InstallReport {
            install_name,
            name: plan.manifest.name.clone(),
            version: plan.manifest.version.clone(),
            install_path: target,
            change,
            execution,
            supported_ides: plan
                .manifest
                .supported_ides()
                .into_iter()
                .map(str::to_string)
                .collect(),
            unsaved_secrets,
            inputs: plan.inputs,
        })
    }

    /// [`plan_install`](Self::plan_install) then
    /// [`execute_install`](Self::execute_install).
    pub fn install(
        &self,
        source: &InstallSource,
        options: &InstallOptions,
        mode: &mut InputMode<'_>,
    ) -> Result<InstallReport> {
        let plan = self.plan_install(source, options, mode)?;
        self.execute_install(plan)
    }

    /// Delete secrets `previous` remembered that are not in `keep`.
    fn forget_secrets(&self, previous: &LedgerEntry, keep: &[String]) {
        for name in previous.secret_inputs.iter().filter(|name| !keep.contains(name)) {
            match self.secrets.delete(&previous.install_name, name) {
                Ok(()) => tracing::debug!(package = %previous.install_name, input = %name, "dropped stale secret"),
                Err(e) => {
                    tracing::warn!(package = %previous.install_name, input = %name, error = %e, "could not delete stale secret")
                }
            }
        }
    }

    /// Store secret values; returns the names that could not be stored.
    fn save_secrets(&self, install_name: &str, inputs: &ResolvedInputs) -> Vec<String> {
        let mut unsaved = Vec::new();
        for (name, value) in inputs.secret_values() {
            if let Err(e) = self.secrets.set(install_name, name, value) {
                tracing::warn!(
                    package = install_name,
                    input = name,
                    backend = self.secrets.backend_name(),
                    error = %e,
                    "secret not saved; it will be asked for again"
                );
                unsaved.push(name.to_string());
            }
        }
        unsaved
    }

    // -----------------------------------------------------------------------
    // Uninstall
    // -----------------------------------------------------------------------

    /// Uninstall commands with remembered values, for display.
    pub fn uninstall_preview(&self, install_name: &str) -> Result<Vec<String>> {
        let (entry, manifest) = self.manifest_of(install_name)?;
        Ok(executor::preview(
            &manifest.uninstall_steps,
            &self.stored_inputs(&entry),
        ))
    }

    /// Run uninstall steps, then remove IDE entries, files, secrets and the
    /// ledger entry.
    ///
    /// A failing uninstall step stops here with everything else left in place.
    pub fn uninstall(&self, install_name: &str, options: &UninstallOptions) -> Result<UninstallReport> {
        let entry = self.ledger.require(install_name)?;
        let mut warnings = Vec::new();

        let manifest = match installed_manifest(&entry) {
            Ok(manifest) => Some(manifest),
            Err(mcpm_meta::Error::NotFound(path)) => {
                warnings.push(format!(
                    "{} is missing; skipping uninstall steps",
                    path.display()
                ));
                None
            }
            Err(e) => return Err(e.into()),
        };

        let execution = match manifest {
            Some(manifest) if !manifest.uninstall_steps.is_empty() => {
                let values = self.stored_inputs(&entry);
                executor::run(&manifest.uninstall_steps, &values, &entry.install_path)?
                    .ensure_success()?
            }
            _ => ExecutionReport::default(),
        };

        let mut removed_from = Vec::new();
        if !options.keep_ide_config {
            for (ide, path) in &self.settings.targets {
                match IdeConfigFile::new(path).remove(&entry.install_name) {
                    Ok(true) => removed_from.push(ide.clone()),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(ide = %ide, error = %e, "could not clean IDE config");
                        warnings.push(format!("{ide}: {e}"));
                    }
                }
            }
        }

        if entry.install_path.exists() {
            fs::remove_dir_all(&entry.install_path)
                .map_err(|e| mcpm_fs::Error::io(&entry.install_path, e))?;
        }

        for name in &entry.secret_inputs {
            if let Err(e) = self.secrets.delete(&entry.install_name, name) {
                warnings.push(format!("secret {name} not deleted: {e}"));
            }
        }

        let entry = self.ledger.remove(&entry.install_name)?;
        tracing::info!(package = %entry.install_name, "uninstalled");
        Ok(UninstallReport {
            entry,
            execution,
            removed_from,
            warnings,
        })
    }

    // -----------------------------------------------------------------------
    // Configure
    // -----------------------------------------------------------------------

    /// Add or remove an installed package's server entry in an IDE's config.
    ///
    /// `Add` uses remembered input values and only prompts, when `mode`
    /// allows, for values that are no longer available. Newly entered values
    /// are remembered.
    pub fn configure(
        &self,
        install_name: &str,
        ide: &str,
        action: ConfigAction,
        mode: &mut InputMode<'_>,
    ) -> Result<ConfigureReport> {
        self.configure_with(install_name, ide, action, &ResolvedInputs::new(), mode)
    }

    /// [`configure`](Self::configure) with extra values that take precedence
    /// over remembered ones.
    pub fn configure_with(
        &self,
        install_name: &str,
        ide: &str,
        action: ConfigAction,
        values: &ResolvedInputs,
        mode: &mut InputMode<'_>,
    ) -> Result<ConfigureReport> {
        let (entry, manifest) = self.manifest_of(install_name)?;
        let config_path = self.settings.target_path(ide)?.to_path_buf();

        let changed = match action {
            ConfigAction::Remove => {
                IdeConfigFile::new(&config_path).remove(&entry.install_name)?
            }
            ConfigAction::Add => {
                let block = manifest
                    .ide_block(ide)
                    .ok_or_else(|| Error::IdeNotSupported {
                        package: entry.install_name.clone(),
                        ide: ide.to_string(),
                        supported: manifest.supported_ides().join(", "),
                    })?;

                let mut known = self.stored_inputs(&entry);
                known.merge(values);
                let inputs = inputs::resolve(&manifest.install_inputs, &known, mode)?;
                if inputs.iter().any(|(name, _)| !known.contains(name)) {
                    self.remember_inputs(&entry, &inputs)?;
                }

                let mut value = block.to_value();
                resolve_package_path(&mut value, &entry.install_path);
                let value = substitute_value(&value, &inputs)?;
                ide_config::apply(ide, &entry.install_name, &value, action, &config_path)?;
                true
            }
        };

        Ok(ConfigureReport {
            install_name: entry.install_name,
            ide: ide.to_string(),
            config_path,
            action,
            changed,
        })
    }

    /// Write a ready-made server entry, not backed by an installed package,
    /// into an IDE's config under `key`.
    ///
    /// `block` is written as is; nothing is substituted.
    pub fn add_server_entry(&self, ide: &str, key: &str, block: &Value) -> Result<ConfigureReport> {
        let config_path = self.settings.target_path(ide)?.to_path_buf();
        ide_config::apply(ide, key, block, ConfigAction::Add, &config_path)?;
        tracing::info!(ide, key, "added server entry");
        Ok(ConfigureReport {
            install_name: key.to_string(),
            ide: ide.to_string(),
            config_path,
            action: ConfigAction::Add,
            changed: true,
        })
    }

    fn remember_inputs(&self, entry: &LedgerEntry, inputs: &ResolvedInputs) -> Result<()> {
        let unsaved = self.save_secrets(&entry.install_name, inputs);
        let mut updated = entry.clone().with_inputs(inputs);
        updated.installed_at = entry.installed_at;
        updated.secret_inputs.retain(|name| !unsaved.contains(name));
        self.ledger.record(updated)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Repair
    // -----------------------------------------------------------------------

    /// Record a package that is on disk under the packages directory but
    /// missing from the ledger, or refresh its recorded version.
    ///
    /// Input values cannot be recovered; `configure` asks for them again.
    pub fn repair(&self, install_name: &str) -> Result<LedgerEntry> {
        let dir = self.settings.package_dir(install_name);
        let previous = self.ledger.lookup(install_name)?;
        let hint = FallbackHint {
            name: Some(install_name.to_string()),
            version: previous.as_ref().map(|entry| entry.version.clone()),
        };
        let manifest = PackageManifest::from_dir_with_fallback(&dir, &hint)?;
        if manifest.install_name != install_name {
            tracing::warn!(
                directory = install_name,
                manifest = %manifest.install_name,
                "manifest install name differs from directory; recording under directory name"
            );
        }

        let entry = match previous {
            Some(previous) => LedgerEntry {
                version: manifest.version.clone(),
                install_path: dir,
                ..previous
            },
            None => LedgerEntry::new(install_name, &manifest.version, dir),
        };
        self.ledger.record(entry.clone())?;
        tracing::info!(package = install_name, version = %entry.version, "repaired ledger entry");
        Ok(entry)
    }
}

/// Read an installed package's manifest. A missing `name` or `version` is
/// taken from its ledger entry, where install recorded the resolved values.
fn installed_manifest(entry: &LedgerEntry) -> mcpm_meta::Result<PackageManifest> {
    let hint = FallbackHint {
        name: Some(entry.install_name.clone()),
        version: Some(entry.version.clone()),
    };
    PackageManifest::from_dir_with_fallback(&entry.install_path, &hint)
}

/// Point a relative `"path"` in a config block at the install directory.
fn resolve_package_path(block: &mut Value, install_path: &Path) {
    if let Some(Value::String(path)) = block.get_mut("path")
        && Path::new(path.as_str()).is_relative()
    {
        let resolved = if path.as_str() == "." {
            install_path.to_path_buf()
        } else {
            install_path.join(path.as_str())
        };
        *path = resolved.to_string_lossy().into_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(None, "1.0.0", VersionChange::Fresh)]
    #[case(Some("1.0.0"), "1.0.0", VersionChange::Reinstall)]
    #[case(Some("1.0.0"), "1.2.0", VersionChange::Upgrade { from: "1.0.0".into() })]
    #[case(Some("2.0.0"), "1.9.9", VersionChange::Downgrade { from: "2.0.0".into() })]
    #[case(Some("nightly"), "1.0.0", VersionChange::Changed { from: "nightly".into() })]
    fn version_change(
        #[case] previous: Option<&str>,
        #[case] next: &str,
        #[case] expected: VersionChange,
    ) {
        assert_eq!(VersionChange::between(previous, next), expected);
    }

    #[test]
    fn relative_path_resolved_against_install_dir() {
        let mut block = json!({"command": "node", "path": "."});
        resolve_package_path(&mut block, Path::new("/pkgs/x"));
        assert_eq!(block["path"], json!("/pkgs/x"));

        let mut block = json!({"command": "node", "path": "bin"});
        resolve_package_path(&mut block, Path::new("/pkgs/x"));
        assert_eq!(block["path"], json!(Path::new("/pkgs/x").join("bin").to_string_lossy()));
    }

    #[test]
    fn absolute_path_left_alone() {
        let mut block = json!({"command": "node", "path": "/opt/server"});
        resolve_package_path(&mut block, Path::new("/pkgs/x"));
        assert_eq!(block["path"], json!("/opt/server"));
    }
}
