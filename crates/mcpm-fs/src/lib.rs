//! Filesystem primitives for mcpm
//!
//! Every file mcpm owns or mutates (the ledger, settings, IDE config files)
//! goes through [`io::write_atomic`], so a crash mid-write leaves either the
//! previous content or the new content on disk, never a truncated file.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
