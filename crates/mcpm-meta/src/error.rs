use std::path::PathBuf;

/// Errors raised while reading or validating a package manifest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A mandatory field was absent and no fallback could supply it.
    #[error("manifest is missing required field `{field}`")]
    MissingField { field: &'static str },

    /// The install name is empty or contains characters outside `[a-z0-9-]`.
    #[error("invalid install name '{value}': {reason}")]
    InvalidInstallName { value: String, reason: String },

    /// Two inputs in `install_inputs` share a name.
    #[error("input '{name}' is declared more than once")]
    DuplicateInput { name: String },

    /// An input name that placeholders could never reference.
    #[error("invalid input name '{name}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidInputName { name: String },

    /// The document is not valid JSON or does not match the manifest schema.
    #[error("failed to parse package manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// No manifest file at the expected path.
    #[error("package manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
