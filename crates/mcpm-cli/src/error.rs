//! Error types for mcpm-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from mcpm-core
    #[error(transparent)]
    Core(#[from] mcpm_core::Error),

    /// Error from mcpm-meta
    #[error(transparent)]
    Meta(#[from] mcpm_meta::Error),

    /// Error from mcpm-registry
    #[error(transparent)]
    Registry(#[from] mcpm_registry::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Interactive prompt error
    #[error("Interactive prompt error: {0}")]
    Dialoguer(#[from] dialoguer::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }

    /// Pipeline stage for core errors, `cli` otherwise.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Core(e) => e.stage(),
            Self::Meta(_) => "manifest",
            Self::Registry(_) => "registry",
            Self::Io(_) | Self::Json(_) => "io",
            Self::Dialoguer(_) | Self::User { .. } => "cli",
        }
    }
}
