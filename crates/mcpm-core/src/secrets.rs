//! Storage for secret input values
//!
//! Secret inputs never reach the ledger file. Their values go to a
//! [`SecretStore`], by default the OS credential store through `keyring`,
//! keyed by `<install_name>/<INPUT>`.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Service name under which credentials are stored.
pub const KEYRING_SERVICE: &str = "mcpm";

/// Where secret input values are kept between invocations.
pub trait SecretStore {
    fn get(&self, install_name: &str, input: &str) -> Result<Option<String>>;
    fn set(&self, install_name: &str, input: &str, value: &str) -> Result<()>;
    /// Deleting a value that was never stored is not an error.
    fn delete(&self, install_name: &str, input: &str) -> Result<()>;
    /// Short name for log and status output.
    fn backend_name(&self) -> &'static str;
}

impl<T: SecretStore + ?Sized> SecretStore for std::sync::Arc<T> {
    fn get(&self, install_name: &str, input: &str) -> Result<Option<String>> {
        (**self).get(install_name, input)
    }

    fn set(&self, install_name: &str, input: &str, value: &str) -> Result<()> {
        (**self).set(install_name, input, value)
    }

    fn delete(&self, install_name: &str, input: &str) -> Result<()> {
        (**self).delete(install_name, input)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

/// Selects the [`SecretStore`] implementation from settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretBackend {
    #[default]
    Keyring,
    Disabled,
}

impl SecretBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keyring" => Some(Self::Keyring),
            "disabled" | "none" | "off" => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keyring => "keyring",
            Self::Disabled => "disabled",
        }
    }

    pub fn open(self) -> Box<dyn SecretStore> {
        match self {
            Self::Keyring => Box::new(KeyringSecretStore::default()),
            Self::Disabled => Box::new(DisabledSecretStore),
        }
    }
}

fn account(install_name: &str, input: &str) -> String {
    format!("{install_name}/{input}")
}

/// OS credential store (macOS Keychain, Windows Credential Manager,
/// Secret Service on Linux).
#[derive(Debug, Clone)]
pub struct KeyringSecretStore {
    service: String,
}

impl Default for KeyringSecretStore {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl KeyringSecretStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, install_name: &str, input: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &account(install_name, input))
            .map_err(|e| Error::SecretStore(e.to_string()))
    }
}

impl SecretStore for KeyringSecretStore {
    fn get(&self, install_name: &str, input: &str) -> Result<Option<String>> {
        match self.entry(install_name, input)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::SecretStore(e.to_string())),
        }
    }

    fn set(&self, install_name: &str, input: &str, value: &str) -> Result<()> {
        self.entry(install_name, input)?
            .set_password(value)
            .map_err(|e| Error::SecretStore(e.to_string()))
    }

    fn delete(&self, install_name: &str, input: &str) -> Result<()> {
        match self.entry(install_name, input)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::SecretStore(e.to_string())),
        }
    }

    fn backend_name(&self) -> &'static str {
        "keyring"
    }
}

/// Process-local store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| Error::SecretStore("memory store poisoned".to_string()))
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, install_name: &str, input: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(&account(install_name, input)).cloned())
    }

    fn set(&self, install_name: &str, input: &str, value: &str) -> Result<()> {
        self.lock()?
            .insert(account(install_name, input), value.to_string());
        Ok(())
    }

    fn delete(&self, install_name: &str, input: &str) -> Result<()> {
        self.lock()?.remove(&account(install_name, input));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Stores nothing; secrets must be supplied on every run.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSecretStore;

impl SecretStore for DisabledSecretStore {
    fn get(&self, _install_name: &str, _input: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn set(&self, install_name: &str, input: &str, _value: &str) -> Result<()> {
        Err(Error::SecretStore(format!(
            "secret storage is disabled; {} will not be remembered for {install_name}",
            input
        )))
    }

    fn delete(&self, _install_name: &str, _input: &str) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "disabled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemorySecretStore::new();
        assert_eq!(store.get("pkg", "KEY").unwrap(), None);

        store.set("pkg", "KEY", "abc").unwrap();
        assert_eq!(store.get("pkg", "KEY").unwrap().as_deref(), Some("abc"));
        assert_eq!(store.get("other", "KEY").unwrap(), None);

        store.delete("pkg", "KEY").unwrap();
        store.delete("pkg", "KEY").unwrap();
        assert_eq!(store.get("pkg", "KEY").unwrap(), None);
    }

    #[test]
    fn disabled_store_refuses_to_persist() {
        let store = DisabledSecretStore;
        assert!(store.set("pkg", "KEY", "abc").is_err());
        assert_eq!(store.get("pkg", "KEY").unwrap(), None);
        assert!(store.delete("pkg", "KEY").is_ok());
    }

    #[test]
    fn backend_parse() {
        assert_eq!(SecretBackend::parse("Keyring"), Some(SecretBackend::Keyring));
        assert_eq!(SecretBackend::parse("disabled"), Some(SecretBackend::Disabled));
        assert_eq!(SecretBackend::parse("vault"), None);
    }
}
