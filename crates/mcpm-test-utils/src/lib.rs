//! Shared test fixtures for the mcpm workspace.
//!
//! Dev-dependency only, never published. Deliberately independent of
//! `mcpm-core` so core's own tests can use it.
//!
//! - [`package`]: [`package::TestPackage`] builder for package directories and archives
//! - [`home`]: [`home::TestHome`], an isolated mcpm home plus fake user home

pub mod home;
pub mod package;

pub use home::TestHome;
pub use package::{BuiltPackage, TestPackage};
