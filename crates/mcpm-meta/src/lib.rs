//! Package manifest model for mcpm.
//!
//! A package ships an [`MANIFEST_FILENAME`] document at its root describing
//! how to install it, which inputs to collect from the user, and how each
//! IDE should launch the server. [`PackageManifest::parse`] turns that JSON
//! into a validated, immutable value.

pub mod error;
pub mod install_name;
pub mod manifest;

pub use error::{Error, Result};
pub use install_name::{derive_install_name, is_valid_install_name};
pub use manifest::{ConfigBlock, FallbackHint, InputSpec, PackageManifest, Step};

/// File name of the manifest at the root of every package.
pub const MANIFEST_FILENAME: &str = "mcp_package.json";
