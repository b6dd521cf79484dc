//! IDE configuration merging
//!
//! IDEs read their MCP servers from a JSON file shaped like
//! `{"mcpServers": {"<install_name>": {...}}, ...}`. Only the entry named by
//! the install name is touched; every other key, at the top level and inside
//! `mcpServers`, is written back exactly as read (key order included).
//!
//! A file that exists but does not parse is never overwritten.

use std::path::{Path, PathBuf};

use mcpm_fs::{RobustnessConfig, io};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Top-level key holding the server map.
pub const SERVERS_KEY: &str = "mcpServers";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    Add,
    Remove,
}

impl ConfigAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "add" => Some(Self::Add),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// One IDE config file on disk.
#[derive(Debug, Clone)]
pub struct IdeConfigFile {
    path: PathBuf,
    robustness: RobustnessConfig,
}

impl IdeConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
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

    /// Read the document. `None` when the file does not exist; an empty file
    /// reads as `{}`.
    fn read(&self) -> Result<Option<Map<String, Value>>> {
        let Some(content) = io::read_optional(&self.path)? else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(Some(Map::new()));
        }

        let value: Value =
            serde_json::from_str(&content).map_err(|e| Error::MalformedExistingConfig {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        match value {
            Value::Object(map) => Ok(Some(map)),
            other => Err(Error::MalformedExistingConfig {
                path: self.path.clone(),
                message: format!("top level is {}, expected an object", json_kind(&other)),
            }),
        }
    }

    fn write(&self, document: Map<String, Value>) -> Result<()> {
        let mut content = serde_json::to_string_pretty(&Value::Object(document))?;
        content.push('\n');
        io::replace_file(&self.path, content.as_bytes(), self.robustness).map_err(|source| {
            Error::ConfigWriteFailed {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Set `mcpServers[install_name]` to `block`, replacing any previous entry.
    pub fn add(&self, install_name: &str, block: &Value) -> Result<()> {
        let mut document = self.read()?.unwrap_or_default();
        servers_mut(&mut document, &self.path)?.insert(install_name.to_string(), block.clone());
        self.write(document)?;
        tracing::info!(path = %self.path.display(), server = install_name, "added server entry");
        Ok(())
    }

    /// Delete `mcpServers[install_name]`.
    ///
    /// Returns whether an entry was removed. Nothing is written, and no file
    /// is created, when there was nothing to remove.
    pub fn remove(&self, install_name: &str) -> Result<bool> {
        let Some(mut document) = self.read()? else {
            return Ok(false);
        };
        let removed = match document.get_mut(SERVERS_KEY) {
            None => false,
            Some(Value::Object(servers)) => servers.shift_remove(install_name).is_some(),
            Some(other) => {
                return Err(Error::MalformedExistingConfig {
                    path: self.path.clone(),
                    message: format!("'{SERVERS_KEY}' is {}, expected an object", json_kind(other)),
                });
            }
        };
        if removed {
            self.write(document)?;
            tracing::info!(path = %self.path.display(), server = install_name, "removed server entry");
        }
        Ok(removed)
    }

    /// All `(name, block)` pairs under `mcpServers`.
    pub fn list(&self) -> Result<Vec<(String, Value)>> {
        let Some(document) = self.read()? else {
            return Ok(Vec::new());
        };
        Ok(match document.get(SERVERS_KEY) {
            Some(Value::Object(servers)) => servers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn contains(&self, install_name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|(name, _)| name == install_name))
    }
}

/// Apply `action` for `install_name` to the config file at `config_path`.
///
/// `block` must already be substituted; it is ignored for
/// [`ConfigAction::Remove`].
pub fn apply(
    ide: &str,
    install_name: &str,
    block: &Value,
    action: ConfigAction,
    config_path: &Path,
) -> Result<()> {
    tracing::debug!(ide, install_name, %action, path = %config_path.display(), "applying IDE config");
    let file = IdeConfigFile::new(config_path);
    match action {
        ConfigAction::Add => file.add(install_name, block),
        ConfigAction::Remove => file.remove(install_name).map(|_| ()),
    }
}

fn servers_mut<'a>(
    document: &'a mut Map<String, Value>,
    path: &Path,
) -> Result<&'a mut Map<String, Value>> {
    let servers = document
        .entry(SERVERS_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    let kind = json_kind(servers);
    servers
        .as_object_mut()
        .ok_or_else(|| Error::MalformedExistingConfig {
            path: path.to_path_buf(),
            message: format!("'{SERVERS_KEY}' is {kind}, expected an object"),
        })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
