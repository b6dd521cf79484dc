//! Client for the mcpm package registry.
//!
//! The registry is a plain HTTP service:
//!
//! - `GET  {base}/packages/` lists the latest version of every package
//! - `GET  {base}/servers` lists the known server catalog
//! - `GET  {base}/packages/{name}/{version}/download` returns the archive
//! - `POST {base}/packages/publish` accepts a multipart upload
//!
//! Failures are reported with a JSON envelope `{"error": .., "details": ..}`.

pub mod client;
pub mod error;
pub mod types;

pub use client::RegistryClient;
pub use error::{Error, Result};
pub use types::{ErrorEnvelope, PackageSummary, PublishMetadata, PublishResponse, ServerSummary};
