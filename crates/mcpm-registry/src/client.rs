//! Blocking registry client

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response, multipart};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::types::{ErrorEnvelope, PackageSummary, PublishMetadata, PublishResponse, ServerSummary};

const USER_AGENT: &str = concat!("mcpm/", env!("CARGO_PKG_VERSION"));

/// Talks to one registry instance.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    http: Client,
}

impl RegistryClient {
    /// `base_url` is the API root, e.g. `http://localhost:8000/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|source| Error::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, http })
    }

    /// Use a preconfigured HTTP client, e.g. one with custom proxy settings.
    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn packages_url(&self) -> String {
        format!("{}/packages/", self.base_url)
    }

    pub fn servers_url(&self) -> String {
        format!("{}/servers", self.base_url)
    }

    /// `version` may be `"latest"`.
    pub fn download_url(&self, name: &str, version: &str) -> String {
        format!("{}/packages/{name}/{version}/download", self.base_url)
    }

    pub fn publish_url(&self) -> String {
        format!("{}/packages/publish", self.base_url)
    }

    /// Latest version of every published package.
    pub fn list_packages(&self) -> Result<Vec<PackageSummary>> {
        self.get_json(&self.packages_url())
    }

    /// The server catalog.
    pub fn list_servers(&self) -> Result<Vec<ServerSummary>> {
        self.get_json(&self.servers_url())
    }

    /// Look a server up by its `registry_name`.
    pub fn find_server(&self, registry_name: &str) -> Result<Option<ServerSummary>> {
        Ok(self
            .list_servers()?
            .into_iter()
            .find(|server| server.registry_name == registry_name))
    }

    /// Download a package archive into `dest_dir` and return its path.
    ///
    /// The file is named after the server's `Content-Disposition` when it
    /// sends one, else `<name>-<version>.zip`. The file only appears once
    /// the body has been fully received.
    pub fn download(&self, name: &str, version: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.download_url(name, version);
        tracing::info!(%url, "downloading package");

        let mut response = self.send(&url, self.http.get(&url))?;
        let file_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_file_name)
            .unwrap_or_else(|| format!("{name}-{version}.zip"));

        std::fs::create_dir_all(dest_dir).map_err(|e| Error::io(dest_dir, e))?;
        let mut temp = tempfile::NamedTempFile::new_in(dest_dir).map_err(|e| Error::io(dest_dir, e))?;
        let bytes = response
            .copy_to(temp.as_file_mut())
            .map_err(|source| Error::Http {
                url: url.clone(),
                source,
            })?;

        let dest = dest_dir.join(file_name);
        temp.persist(&dest).map_err(|e| Error::io(&dest, e.error))?;
        tracing::debug!(path = %dest.display(), bytes, "download complete");
        Ok(dest)
    }

    /// Upload an archive with its metadata.
    pub fn publish(&self, archive: &Path, metadata: &PublishMetadata) -> Result<PublishResponse> {
        let url = self.publish_url();
        let bytes = std::fs::read(archive).map_err(|e| Error::io(archive, e))?;
        let file_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package.zip".to_string());
        let metadata_json = serde_json::to_string(metadata).map_err(|source| Error::Decode {
            url: url.clone(),
            source,
        })?;

        let package = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")
            .map_err(|source| Error::Http {
                url: url.clone(),
                source,
            })?;
        let form = multipart::Form::new()
            .text("metadata", metadata_json)
            .part("package", package);

        tracing::info!(%url, name = %metadata.name, version = %metadata.version, "publishing package");
        let response = self.send(&url, self.http.post(&url).multipart(form))?;
        decode(&url, response)
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!(%url, "GET");
        let response = self.send(url, self.http.get(url))?;
        decode(url, response)
    }

    fn send(&self, url: &str, request: reqwest::blocking::RequestBuilder) -> Result<Response> {
        let response = request.send().map_err(|source| Error::Http {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(status_error(status.as_u16(), &body))
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    let body = response.text().map_err(|source| Error::Http {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|source| Error::Decode {
        url: url.to_string(),
        source,
    })
}

/// Build [`Error::Status`] from a failed response body.
pub(crate) fn status_error(status: u16, body: &str) -> Error {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return Error::Status {
            status,
            message: envelope.error,
            details: envelope.details,
        };
    }
    let body = body.trim();
    let message = if body.is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.chars().take(200).collect()
    };
    Error::Status {
        status,
        message,
        details: None,
    }
}

/// File name from a `Content-Disposition` header, stripped of any directory.
fn disposition_file_name(header: &str) -> Option<String> {
    let raw = header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"');
    Path::new(raw)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn urls_trim_trailing_slash() {
        let client = RegistryClient::new("http://localhost:8000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api");
        assert_eq!(client.packages_url(), "http://localhost:8000/api/packages/");
        assert_eq!(client.servers_url(), "http://localhost:8000/api/servers");
        assert_eq!(
            client.download_url("weather", "latest"),
            "http://localhost:8000/api/packages/weather/latest/download"
        );
        assert_eq!(client.publish_url(), "http://localhost:8000/api/packages/publish");
    }

    #[test]
    fn envelope_becomes_status_error() {
        let err = status_error(409, r#"{"error": "version exists", "details": "1.0.0"}"#);
        assert!(matches!(
            &err,
            Error::Status { status: 409, message, details: Some(d) }
                if message == "version exists" && d == "1.0.0"
        ));
        assert_eq!(err.to_string(), "registry returned 409: version exists (1.0.0)");
    }

    #[rstest]
    #[case("", "Not Found")]
    #[case("  no such package \n", "no such package")]
    fn non_json_body_is_used_verbatim(#[case] body: &str, #[case] expected: &str) {
        let err = status_error(404, body);
        assert!(err.is_not_found());
        assert!(matches!(err, Error::Status { message, details: None, .. } if message == expected));
    }

    #[rstest]
    #[case("attachment; filename=\"weather-1.0.0.zip\"", Some("weather-1.0.0.zip"))]
    #[case("attachment; filename=pkg.mcpz", Some("pkg.mcpz"))]
    #[case("attachment; filename=\"../../etc/passwd\"", Some("passwd"))]
    #[case("inline", None)]
    fn disposition_parsing(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(disposition_file_name(header).as_deref(), expected);
    }
}
