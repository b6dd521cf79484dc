//! Ledger entry type

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inputs::ResolvedInputs;

/// One installed package.
///
/// Secret input values are never stored here; only their names, in
/// `secret_inputs`, so they can be fetched from the secret store later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub install_name: String,
    pub version: String,
    pub install_path: PathBuf,
    pub installed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_checksum: Option<String>,
    #[serde(default)]
    pub secret_inputs: Vec<String>,
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

impl LedgerEntry {
    pub fn new(
        install_name: impl Into<String>,
        version: impl Into<String>,
        install_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            install_name: install_name.into(),
            version: version.into(),
            install_path: install_path.into(),
            installed_at: Utc::now(),
            archive_checksum: None,
            secret_inputs: Vec::new(),
            inputs: BTreeMap::new(),
        }
    }

    /// Store the plain values of `inputs` and the names of its secrets.
    pub fn with_inputs(mut self, inputs: &ResolvedInputs) -> Self {
        self.inputs = inputs.public_values();
        self.secret_inputs = inputs.secret_values().map(|(k, _)| k.to_string()).collect();
        self
    }

    pub fn with_checksum(mut self, checksum: Option<String>) -> Self {
        self.archive_checksum = checksum;
        self
    }

    /// The stored plain values.
    pub fn stored_inputs(&self) -> ResolvedInputs {
        self.inputs.iter().collect()
    }
}
