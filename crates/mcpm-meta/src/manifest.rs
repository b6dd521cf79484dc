//! Package manifest parsing for `mcp_package.json` files.
//!
//! # Example
//!
//! ```json
//! {
//!   "name": "My Server",
//!   "version": "1.0.0",
//!   "install_inputs": [
//!     { "name": "API_KEY", "prompt": "API key", "secret": true }
//!   ],
//!   "install_steps": [
//!     { "type": "shell", "command": "npm install" }
//!   ],
//!   "ide_config_commands": {
//!     "windsurf": {
//!       "command": "node",
//!       "args": ["server.js"],
//!       "env": { "API_KEY": "${API_KEY}" }
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::install_name::{derive_install_name, is_valid_install_name};
use crate::MANIFEST_FILENAME;

/// A validated package manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageManifest {
    /// Human-readable display name.
    pub name: String,
    /// Normalized identifier, `[a-z0-9-]+`.
    pub install_name: String,
    /// Free-form version string; usually semver.
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    pub install_steps: Vec<Step>,
    pub uninstall_steps: Vec<Step>,
    pub install_inputs: Vec<InputSpec>,
    pub ide_config_commands: BTreeMap<String, ConfigBlock>,
}

/// The on-disk shape, before mandatory fields are checked.
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    install_name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    author: Option<String>,
    license: Option<String>,
    entrypoint: Option<String>,
    runtime: Option<String>,
    #[serde(default)]
    install_steps: Vec<Step>,
    #[serde(default)]
    uninstall_steps: Vec<Step>,
    #[serde(default)]
    install_inputs: Vec<InputSpec>,
    #[serde(default)]
    ide_config_commands: BTreeMap<String, ConfigBlock>,
}

/// One install or uninstall step.
///
/// The `type` field selects the variant. Types this build does not know are
/// kept as [`Step::Unsupported`] so the executor can reject the whole list
/// before anything runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStep", into = "RawStep")]
pub enum Step {
    /// A command line handed to the platform shell.
    Shell { command: String },
    /// Any other `type` value.
    Unsupported { kind: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawStep {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<String>,
}

impl TryFrom<RawStep> for Step {
    type Error = String;

    fn try_from(raw: RawStep) -> std::result::Result<Self, Self::Error> {
        match (raw.kind.as_str(), raw.command) {
            ("shell", Some(command)) => Ok(Step::Shell { command }),
            ("shell", None) => Err("shell step is missing `command`".to_string()),
            (_, _) => Ok(Step::Unsupported { kind: raw.kind }),
        }
    }
}

impl From<Step> for RawStep {
    fn from(step: Step) -> Self {
        match step {
            Step::Shell { command } => RawStep {
                kind: "shell".to_string(),
                command: Some(command),
            },
            Step::Unsupported { kind } => RawStep {
                kind,
                command: None,
            },
        }
    }
}

impl Step {
    /// Convenience constructor for a shell step.
    pub fn shell(command: impl Into<String>) -> Self {
        Step::Shell {
            command: command.into(),
        }
    }

    /// The `type` discriminant as written in the manifest.
    pub fn kind(&self) -> &str {
        match self {
            Step::Shell { .. } => "shell",
            Step::Unsupported { kind } => kind,
        }
    }
}

/// A value the user supplies at install time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Identifier referenced by `${NAME}` placeholders.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,
    /// Secret values are masked when typed and never stored in plain text.
    #[serde(default)]
    pub secret: bool,
}

fn default_input_type() -> String {
    "string".to_string()
}

impl InputSpec {
    /// The text shown when prompting for this input.
    pub fn prompt_text(&self) -> String {
        self.prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| format!("Enter value for {}", self.name))
    }
}

/// How an IDE launches the server, before substitution.
///
/// Keys other than `command`, `args` and `env` are kept verbatim in `extra`
/// and written through to the IDE config. `env` keeps the manifest's key
/// order; every value is a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigBlock {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Map::is_empty",
        deserialize_with = "string_values"
    )]
    pub env: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigBlock {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: Map::new(),
            extra: Map::new(),
        }
    }

    /// The block as a JSON object, ready for substitution.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("command".into(), Value::String(self.command.clone()));
        obj.insert(
            "args".into(),
            Value::Array(self.args.iter().cloned().map(Value::String).collect()),
        );
        if !self.env.is_empty() {
            obj.insert("env".into(), Value::Object(self.env.clone()));
        }
        for (k, v) in &self.extra {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

fn string_values<'de, D>(deserializer: D) -> std::result::Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Map::<String, Value>::deserialize(deserializer)?;
    if let Some((key, _)) = map.iter().find(|(_, value)| !value.is_string()) {
        return Err(serde::de::Error::custom(format!(
            "env value for `{key}` must be a string"
        )));
    }
    Ok(map)
}

/// Values to fall back on when the manifest omits `name` or `version`.
///
/// Usually derived from the archive or directory the manifest came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackHint {
    pub name: Option<String>,
    pub version: Option<String>,
}

impl FallbackHint {
    /// Derive a hint from a package file or directory name.
    ///
    /// `my-server-1.0.0.zip` yields name `my-server`, version `1.0.0`;
    /// a name without a trailing `-<digit>...` segment yields only a name.
    pub fn from_file_name(file_name: &str) -> Self {
        let stem = [".zip", ".mcpz"]
            .iter()
            .find_map(|ext| file_name.strip_suffix(ext))
            .unwrap_or(file_name);

        if stem.trim().is_empty() {
            return Self::default();
        }

        let split = stem.char_indices().rev().find(|&(i, c)| {
            c == '-'
                && i > 0
                && stem[i + 1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
        });

        match split {
            Some((i, _)) => Self {
                name: Some(stem[..i].to_string()),
                version: Some(stem[i + 1..].to_string()),
            },
            None => Self {
                name: Some(stem.to_string()),
                version: None,
            },
        }
    }

    /// Derive a hint from the last component of `path`.
    pub fn from_path(path: &Path) -> Self {
        path.file_name()
            .map(|n| Self::from_file_name(&n.to_string_lossy()))
            .unwrap_or_default()
    }
}

impl PackageManifest {
    /// Parse and validate a manifest from its JSON text.
    pub fn parse(raw_json: &str) -> Result<Self> {
        Self::parse_with_fallback(raw_json, &FallbackHint::default())
    }

    /// Parse a manifest, filling a missing `name`/`version` from `hint`.
    pub fn parse_with_fallback(raw_json: &str, hint: &FallbackHint) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(raw_json)?;

        let name = non_blank(raw.name)
            .or_else(|| non_blank(hint.name.clone()))
            .ok_or(Error::MissingField { field: "name" })?;
        let version = non_blank(raw.version)
            .or_else(|| non_blank(hint.version.clone()))
            .ok_or(Error::MissingField { field: "version" })?;

        let install_name = match non_blank(raw.install_name) {
            Some(explicit) => {
                if !is_valid_install_name(&explicit) {
                    return Err(Error::InvalidInstallName {
                        value: explicit,
                        reason: "must match [a-z0-9-]+".to_string(),
                    });
                }
                explicit
            }
            None => {
                let derived = derive_install_name(&name);
                if derived.is_empty() {
                    return Err(Error::InvalidInstallName {
                        value: name.clone(),
                        reason: "name contains no characters usable in an install name"
                            .to_string(),
                    });
                }
                derived
            }
        };

        let mut seen = HashSet::new();
        for input in &raw.install_inputs {
            if !is_identifier(&input.name) {
                return Err(Error::InvalidInputName {
                    name: input.name.clone(),
                });
            }
            if !seen.insert(input.name.as_str()) {
                return Err(Error::DuplicateInput {
                    name: input.name.clone(),
                });
            }
        }

        Ok(Self {
            name,
            install_name,
            version,
            description: raw.description,
            author: raw.author,
            license: raw.license,
            entrypoint: raw.entrypoint,
            runtime: raw.runtime,
            install_steps: raw.install_steps,
            uninstall_steps: raw.uninstall_steps,
            install_inputs: raw.install_inputs,
            ide_config_commands: raw.ide_config_commands,
        })
    }

    /// Read and parse a manifest file; the hint comes from its parent directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let hint = path.parent().map(FallbackHint::from_path).unwrap_or_default();
        Self::from_path_with_fallback(path, &hint)
    }

    /// Read and parse a manifest file, filling a missing `name`/`version`
    /// from `hint`.
    pub fn from_path_with_fallback(path: &Path, hint: &FallbackHint) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.to_path_buf())
            } else {
                Error::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Self::parse_with_fallback(&content, hint)
    }

    /// Read the manifest at the root of a package directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Self::from_path(&dir.join(MANIFEST_FILENAME))
    }

    /// [`from_dir`](Self::from_dir) with an explicit fallback instead of one
    /// guessed from the directory name.
    pub fn from_dir_with_fallback(dir: &Path, hint: &FallbackHint) -> Result<Self> {
        Self::from_path_with_fallback(&dir.join(MANIFEST_FILENAME), hint)
    }

    /// Look up the config block declared for `ide`.
    pub fn ide_block(&self, ide: &str) -> Option<&ConfigBlock> {
        self.ide_config_commands.get(ide)
    }

    /// IDE identifiers this package declares a config block for.
    pub fn supported_ides(&self) -> Vec<&str> {
        self.ide_config_commands.keys().map(String::as_str).collect()
    }

    /// Names of inputs flagged as secret.
    pub fn secret_inputs(&self) -> impl Iterator<Item = &str> {
        self.install_inputs
            .iter()
            .filter(|i| i.secret)
            .map(|i| i.name.as_str())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
