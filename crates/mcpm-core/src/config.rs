//! Settings
//!
//! Resolution order, later wins: built-in defaults, `<home>/config.toml`,
//! environment variables.
//!
//! ```toml
//! registry_url = "https://registry.example.com/api"
//! secret_backend = "keyring"
//!
//! [targets]
//! windsurf = "~/.codeium/windsurf/mcp_config.json"
//! my-ide = "/opt/my-ide/mcp.json"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mcpm_fs::ConfigStore;
use serde::{Deserialize, Serialize};

use crate::secrets::SecretBackend;
use crate::{Error, Result};

pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8000/api";

pub const ENV_HOME: &str = "MCPM_HOME";
pub const ENV_REGISTRY_URL: &str = "MCPM_REGISTRY_URL";
pub const ENV_SECRET_BACKEND: &str = "MCPM_SECRET_BACKEND";
pub const ENV_WINDSURF_CONFIG: &str = "WINDSURF_MCP_CONFIG_PATH";
const ENV_TARGET_PREFIX: &str = "MCPM_TARGET_";

/// Contents of `config.toml`; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_backend: Option<SecretBackend>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, String>,
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub home: PathBuf,
    pub registry_url: String,
    pub secret_backend: SecretBackend,
    /// IDE identifier to config file path.
    pub targets: BTreeMap<String, PathBuf>,
}

impl Settings {
    /// Load from the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load using `env` to read environment variables.
    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let user_home = dirs::home_dir().ok_or(Error::HomeDirNotFound)?;
        let home = match env(ENV_HOME).filter(|v| !v.trim().is_empty()) {
            Some(home) => expand_tilde(&home, &user_home),
            None => user_home.join(".mcpm"),
        };

        let mut settings = Self::with_home(home, &user_home);

        let config_path = settings.config_path();
        if let Some(file) = ConfigStore::new().load_optional::<SettingsFile>(&config_path)? {
            tracing::debug!(path = %config_path.display(), "loaded settings file");
            settings.apply_file(file, &user_home);
        }

        settings.apply_env(&env, &user_home);
        Ok(settings)
    }

    /// Defaults rooted at `home`, with IDE targets under `user_home`.
    pub fn with_home(home: impl Into<PathBuf>, user_home: &Path) -> Self {
        Self {
            home: home.into(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            secret_backend: SecretBackend::default(),
            targets: default_targets(user_home),
        }
    }

    fn apply_file(&mut self, file: SettingsFile, user_home: &Path) {
        if let Some(url) = file.registry_url {
            self.registry_url = url;
        }
        if let Some(backend) = file.secret_backend {
            self.secret_backend = backend;
        }
        for (ide, path) in file.targets {
            self.targets.insert(ide, expand_tilde(&path, user_home));
        }
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>, user_home: &Path) {
        if let Some(url) = env(ENV_REGISTRY_URL).filter(|v| !v.trim().is_empty()) {
            self.registry_url = url;
        }
        if let Some(raw) = env(ENV_SECRET_BACKEND) {
            match SecretBackend::parse(&raw) {
                Some(backend) => self.secret_backend = backend,
                None => tracing::warn!(value = %raw, "ignoring unknown {ENV_SECRET_BACKEND}"),
            }
        }
        if let Some(path) = env(ENV_WINDSURF_CONFIG).filter(|v| !v.trim().is_empty()) {
            self.targets
                .insert("windsurf".to_string(), expand_tilde(&path, user_home));
        }
        let ides: Vec<String> = self.targets.keys().cloned().collect();
        for ide in ides {
            if let Some(path) = env(&target_env_var(&ide)).filter(|v| !v.trim().is_empty()) {
                self.targets.insert(ide, expand_tilde(&path, user_home));
            }
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.home.join("packages")
    }

    pub fn package_dir(&self, install_name: &str) -> PathBuf {
        self.packages_dir().join(install_name)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.home.join("ledger.toml")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.home.join("downloads")
    }

    /// Config file path for `ide`.
    pub fn target_path(&self, ide: &str) -> Result<&Path> {
        self.targets
            .get(ide)
            .map(PathBuf::as_path)
            .ok_or_else(|| Error::UnknownTarget {
                ide: ide.to_string(),
                known: self.known_targets().join(", "),
            })
    }

    pub fn known_targets(&self) -> Vec<&str> {
        self.targets.keys().map(String::as_str).collect()
    }
}

/// `MCPM_TARGET_<IDE>`, upper-cased with dashes as underscores.
pub fn target_env_var(ide: &str) -> String {
    format!(
        "{ENV_TARGET_PREFIX}{}",
        ide.to_ascii_uppercase().replace('-', "_")
    )
}

fn default_targets(user_home: &Path) -> BTreeMap<String, PathBuf> {
    let mut targets = BTreeMap::new();
    targets.insert(
        "windsurf".to_string(),
        user_home.join(".codeium").join("windsurf").join("mcp_config.json"),
    );
    targets.insert(
        "cursor".to_string(),
        user_home.join(".cursor").join("mcp.json"),
    );
    targets.insert("claude-desktop".to_string(), claude_desktop_config(user_home));
    targets
}

#[cfg(target_os = "macos")]
fn claude_desktop_config(user_home: &Path) -> PathBuf {
    user_home
        .join("Library")
        .join("Application Support")
        .join("Claude")
        .join("claude_desktop_config.json")
}

#[cfg(target_os = "windows")]
fn claude_desktop_config(user_home: &Path) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| user_home.join("AppData").join("Roaming"))
        .join("Claude")
        .join("claude_desktop_config.json")
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn claude_desktop_config(user_home: &Path) -> PathBuf {
    user_home
        .join(".config")
        .join("Claude")
        .join("claude_desktop_config.json")
}

fn expand_tilde(raw: &str, user_home: &Path) -> PathBuf {
    if raw == "~" {
        return user_home.to_path_buf();
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => user_home.join(rest),
        None => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn home_from_env_and_derived_paths() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().to_string_lossy().into_owned();
        let settings = Settings::load_with(env_from(&[(ENV_HOME, &home)])).unwrap();

        assert_eq!(settings.home, dir.path());
        assert_eq!(settings.ledger_path(), dir.path().join("ledger.toml"));
        assert_eq!(settings.package_dir("x"), dir.path().join("packages").join("x"));
        assert_eq!(settings.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(settings.secret_backend, SecretBackend::Keyring);
    }

    #[test]
    fn config_file_then_env_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "registry_url = \"http://file\"\nsecret_backend = \"disabled\"\n\n[targets]\nmy-ide = \"/opt/ide/mcp.json\"\ncursor = \"/from/file.json\"\n",
        )
        .unwrap();
        let home = dir.path().to_string_lossy().into_owned();

        let settings = Settings::load_with(env_from(&[
            (ENV_HOME, &home),
            (ENV_REGISTRY_URL, "http://env"),
            ("MCPM_TARGET_MY_IDE", "/env/ide.json"),
        ]))
        .unwrap();

        assert_eq!(settings.registry_url, "http://env");
        assert_eq!(settings.secret_backend, SecretBackend::Disabled);
        assert_eq!(settings.target_path("my-ide").unwrap(), Path::new("/env/ide.json"));
        assert_eq!(settings.target_path("cursor").unwrap(), Path::new("/from/file.json"));
    }

    #[test]
    fn windsurf_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().to_string_lossy().into_owned();
        let settings = Settings::load_with(env_from(&[
            (ENV_HOME, &home),
            (ENV_WINDSURF_CONFIG, "/custom/windsurf.json"),
        ]))
        .unwrap();
        assert_eq!(
            settings.target_path("windsurf").unwrap(),
            Path::new("/custom/windsurf.json")
        );
    }

    #[test]
    fn unknown_target_lists_known() {
        let settings = Settings::with_home("/h", Path::new("/u"));
        let err = settings.target_path("vim").unwrap_err();
        match err {
            Error::UnknownTarget { ide, known } => {
                assert_eq!(ide, "vim");
                assert_eq!(known, "claude-desktop, cursor, windsurf");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tilde_expansion() {
        let home = Path::new("/home/me");
        assert_eq!(expand_tilde("~", home), PathBuf::from("/home/me"));
        assert_eq!(expand_tilde("~/x/y.json", home), PathBuf::from("/home/me/x/y.json"));
        assert_eq!(expand_tilde("/abs", home), PathBuf::from("/abs"));
    }

    #[test]
    fn target_env_var_name() {
        assert_eq!(target_env_var("claude-desktop"), "MCPM_TARGET_CLAUDE_DESKTOP");
    }
}
