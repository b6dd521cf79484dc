//! [`TestHome`]: isolated mcpm home and user home directories.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

/// A temp directory holding an mcpm home (`mcpm/`) and a fake user home
/// (`user/`) for IDE config files.
pub struct TestHome {
    temp: TempDir,
}

impl Default for TestHome {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHome {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("TestHome::new: failed to create temp dir");
        fs::create_dir_all(temp.path().join("mcpm")).unwrap();
        fs::create_dir_all(temp.path().join("user")).unwrap();
        Self { temp }
    }

    /// Value for `MCPM_HOME`.
    pub fn mcpm_home(&self) -> PathBuf {
        self.temp.path().join("mcpm")
    }

    pub fn user_home(&self) -> PathBuf {
        self.temp.path().join("user")
    }

    /// A config file path for a test IDE target.
    pub fn ide_config(&self, ide: &str) -> PathBuf {
        self.user_home().join(format!(".{ide}")).join("mcp.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.mcpm_home().join("ledger.toml")
    }

    pub fn package_dir(&self, install_name: &str) -> PathBuf {
        self.mcpm_home().join("packages").join(install_name)
    }

    /// Write `config.toml` into the mcpm home.
    pub fn write_settings(&self, content: &str) {
        fs::write(self.mcpm_home().join("config.toml"), content).unwrap();
    }

    /// Read and parse a JSON file, panicking with the path on failure.
    pub fn read_json(&self, path: &Path) -> Value {
        let content = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
        serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("invalid JSON in {}: {e}", path.display()))
    }

    pub fn read_ledger(&self) -> String {
        fs::read_to_string(self.ledger_path()).unwrap_or_default()
    }
}
