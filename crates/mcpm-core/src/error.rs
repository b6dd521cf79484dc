//! Error types for mcpm-core

use std::path::PathBuf;

/// Result type for mcpm-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mcpm-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Input resolution
    #[error("No value for required input '{name}' (pass --input {name}=VALUE or run interactively)")]
    MissingRequiredInput { name: String },

    #[error("Input cancelled")]
    Cancelled,

    // Substitution
    #[error("Unknown variable(s) in template: {}", names.join(", "))]
    UnknownVariable { names: Vec<String> },

    // Step execution
    #[error("Step {} has unsupported type '{kind}' (only 'shell' is supported)", index + 1)]
    UnsupportedStepType { index: usize, kind: String },

    #[error("Step {} failed ({}): {command}{}", index + 1, describe_exit(exit_code), describe_output(output))]
    NonZeroExit {
        index: usize,
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Failed to start step {}: {source}", index + 1)]
    StepSpawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    // IDE config
    #[error("Existing config at {path} is not valid JSON ({message}); refusing to overwrite it")]
    MalformedExistingConfig { path: PathBuf, message: String },

    #[error("Failed to write config {path}: {source}")]
    ConfigWriteFailed {
        path: PathBuf,
        #[source]
        source: mcpm_fs::Error,
    },

    #[error("Unknown IDE target '{ide}' (known targets: {known})")]
    UnknownTarget { ide: String, known: String },

    #[error("Package '{package}' has no configuration for '{ide}' (supported: {supported})")]
    IdeNotSupported {
        package: String,
        ide: String,
        supported: String,
    },

    // Ledger
    #[error("Package '{0}' is not installed")]
    PackageNotInstalled(String),

    #[error("Ledger at {path} is locked by another mcpm process")]
    LedgerWriteConflict { path: PathBuf },

    #[error(
        "Package '{install_name}' was installed but could not be recorded in the ledger: {source}. \
         Run `mcpm repair {install_name}` once the ledger is writable"
    )]
    LedgerOutOfSync {
        install_name: String,
        #[source]
        source: Box<Error>,
    },

    // Archives
    #[error("Invalid package archive {path}: {message}")]
    InvalidArchive { path: PathBuf, message: String },

    // Secrets
    #[error("Secret store error: {0}")]
    SecretStore(String),

    #[error("Could not determine the user's home directory")]
    HomeDirNotFound,

    // Transparent wrappers for underlying crate errors
    #[error(transparent)]
    Meta(#[from] mcpm_meta::Error),

    #[error(transparent)]
    Fs(#[from] mcpm_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

impl Error {
    /// The pipeline stage the error belongs to, for user-facing messages.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MissingRequiredInput { .. } | Self::Cancelled => "inputs",
            Self::UnknownVariable { .. } => "substitution",
            Self::UnsupportedStepType { .. } | Self::NonZeroExit { .. } | Self::StepSpawn { .. } => {
                "steps"
            }
            Self::MalformedExistingConfig { .. }
            | Self::ConfigWriteFailed { .. }
            | Self::UnknownTarget { .. }
            | Self::IdeNotSupported { .. } => "ide-config",
            Self::PackageNotInstalled(_)
            | Self::LedgerWriteConflict { .. }
            | Self::LedgerOutOfSync { .. }
            | Self::TomlDe(_)
            | Self::TomlSer(_) => "ledger",
            Self::InvalidArchive { .. } | Self::Zip(_) => "archive",
            Self::Meta(_) => "manifest",
            Self::SecretStore(_) => "secrets",
            Self::HomeDirNotFound => "settings",
            Self::Fs(_) | Self::Io(_) | Self::Json(_) => "io",
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn describe_output(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{trimmed}")
    }
}
