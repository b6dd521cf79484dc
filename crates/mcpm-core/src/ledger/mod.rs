//! Local package ledger
//!
//! The ledger is the record of installed packages, keyed by install name, and
//! the source of truth for "is X installed". It is a TOML file:
//!
//! ```toml
//! version = "1.0"
//!
//! [packages.my-server]
//! install_name = "my-server"
//! version = "1.0.0"
//! install_path = "/home/user/.mcpm/packages/my-server"
//! installed_at = "2025-01-01T00:00:00Z"
//! secret_inputs = ["API_KEY"]
//!
//! [packages.my-server.inputs]
//! REGION = "eu"
//! ```
//!
//! Every mutation is a read-modify-write under an exclusive lock on
//! `ledger.toml.lock`, and the file is replaced by rename, so a crash leaves
//! either the old or the new ledger.

mod entry;

pub use entry::LedgerEntry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mcpm_fs::{RobustnessConfig, io};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const LEDGER_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerFile {
    version: String,
    #[serde(default)]
    packages: BTreeMap<String, LedgerEntry>,
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION.to_string(),
            packages: BTreeMap::new(),
        }
    }
}

/// Handle on a ledger file. Cheap to clone; holds no open files.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    robustness: RobustnessConfig,
}

impl Ledger {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            robustness: RobustnessConfig::default(),
        }
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<LedgerFile> {
        match io::read_optional(&self.path)? {
            Some(content) => Ok(toml::from_str(&content)?),
            None => Ok(LedgerFile::default()),
        }
    }

    /// Run `change` on the loaded ledger under the write lock and persist it.
    fn update<T>(&self, change: impl FnOnce(&mut LedgerFile) -> Result<T>) -> Result<T> {
        let _lock = io::acquire_lock(&self.path, self.robustness).map_err(|e| {
            if e.is_lock_contention() {
                Error::LedgerWriteConflict {
                    path: self.path.clone(),
                }
            } else {
                Error::Fs(e)
            }
        })?;

        let mut ledger = self.load()?;
        let result = change(&mut ledger)?;
        let content = toml::to_string_pretty(&ledger)?;
        io::write_atomic_locked(&self.path, content.as_bytes(), self.robustness)?;
        Ok(result)
    }

    /// Insert or replace the entry for `entry.install_name`.
    ///
    /// Returns the entry it replaced, if any.
    pub fn record(&self, entry: LedgerEntry) -> Result<Option<LedgerEntry>> {
        tracing::debug!(package = %entry.install_name, version = %entry.version, "recording ledger entry");
        self.update(|ledger| Ok(ledger.packages.insert(entry.install_name.clone(), entry)))
    }

    pub fn lookup(&self, install_name: &str) -> Result<Option<LedgerEntry>> {
        Ok(self.load()?.packages.remove(install_name))
    }

    /// Like [`lookup`](Self::lookup), failing with
    /// [`Error::PackageNotInstalled`] when absent.
    pub fn require(&self, install_name: &str) -> Result<LedgerEntry> {
        self.lookup(install_name)?
            .ok_or_else(|| Error::PackageNotInstalled(install_name.to_string()))
    }

    /// Delete the entry for `install_name` and return it.
    pub fn remove(&self, install_name: &str) -> Result<LedgerEntry> {
        self.update(|ledger| {
            ledger
                .packages
                .remove(install_name)
                .ok_or_else(|| Error::PackageNotInstalled(install_name.to_string()))
        })
    }

    /// All entries, ordered by install name.
    pub fn list(&self) -> Result<Vec<LedgerEntry>> {
        Ok(self.load()?.packages.into_values().collect())
    }

    pub fn is_installed(&self, install_name: &str) -> Result<bool> {
        Ok(self.load()?.packages.contains_key(install_name))
    }
}
