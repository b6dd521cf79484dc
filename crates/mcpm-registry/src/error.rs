//! Error types for mcpm-registry

use std::path::PathBuf;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors talking to the registry
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, TLS or protocol failure
    #[error("registry request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The registry answered with a non-success status
    #[error("registry returned {status}: {message}{}", details_suffix(.details))]
    Status {
        status: u16,
        message: String,
        details: Option<String>,
    },

    /// The response body was not the expected JSON
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A catalog server whose `config_command` cannot be used
    #[error("server '{registry_name}' has no usable configuration: {reason}")]
    InvalidServerConfig {
        registry_name: String,
        reason: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for a 404 from the registry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

fn details_suffix(details: &Option<String>) -> String {
    details
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}
