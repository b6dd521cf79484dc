//! Wire types for registry requests and responses

use mcpm_meta::PackageManifest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One row of `GET /packages/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub name: String,
    #[serde(default)]
    pub install_name: Option<String>,
    pub latest_version: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl PackageSummary {
    /// Case-insensitive match on name, install name or description.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [
            Some(self.name.as_str()),
            self.install_name.as_deref(),
            self.description.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

/// One row of `GET /servers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSummary {
    pub registry_name: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `{"mcpServers": {"<key>": {..}}}`, usually sent as a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_command: Option<Value>,
}

impl ServerSummary {
    /// The IDE config key and launch block this server asks for.
    ///
    /// Only the first entry of `mcpServers` is used.
    pub fn launch_entry(&self) -> Result<(String, Value)> {
        let invalid = |reason: &str| Error::InvalidServerConfig {
            registry_name: self.registry_name.clone(),
            reason: reason.to_string(),
        };

        let document = match &self.config_command {
            None => return Err(invalid("no config_command")),
            Some(Value::String(text)) => serde_json::from_str(text)
                .map_err(|e| invalid(&format!("config_command is not JSON: {e}")))?,
            Some(other) => other.clone(),
        };
        let servers = document
            .get("mcpServers")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("config_command has no 'mcpServers' object"))?;
        if servers.len() > 1 {
            tracing::warn!(
                server = %self.registry_name,
                count = servers.len(),
                "config_command lists several servers; using the first"
            );
        }
        let (key, block) = servers
            .iter()
            .next()
            .ok_or_else(|| invalid("'mcpServers' is empty"))?;
        if !block.is_object() {
            return Err(invalid(&format!("entry '{key}' is not an object")));
        }
        Ok((key.clone(), block.clone()))
    }
}

/// The `metadata` part of a publish upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub license: String,
    pub runtime: String,
    pub entrypoint: String,
}

impl From<&PackageManifest> for PublishMetadata {
    fn from(manifest: &PackageManifest) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            description: text(&manifest.description),
            author: text(&manifest.author),
            license: text(&manifest.license),
            runtime: manifest
                .runtime
                .clone()
                .unwrap_or_else(|| "generic".to_string()),
            entrypoint: text(&manifest.entrypoint),
        }
    }
}

/// Success body of `POST /packages/publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResponse {
    #[serde(default)]
    pub message: String,
    pub name: String,
    pub version: String,
}

/// Body of every registry error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn package_summary_tolerates_missing_optional_fields() {
        let rows: Vec<PackageSummary> =
            serde_json::from_str(r#"[{"name": "Weather", "latest_version": "1.2.0"}]"#).unwrap();
        assert_eq!(rows[0].install_name, None);
        assert_eq!(rows[0].latest_version, "1.2.0");
    }

    #[test]
    fn search_matches_any_text_field() {
        let row = PackageSummary {
            name: "Weather".into(),
            install_name: Some("weather".into()),
            latest_version: "1.0.0".into(),
            description: Some("Forecasts from NOAA".into()),
        };
        assert!(row.matches("weath"));
        assert!(row.matches("noaa"));
        assert!(!row.matches("github"));
    }

    fn server(config_command: Option<Value>) -> ServerSummary {
        ServerSummary {
            registry_name: "calc".into(),
            name: "Calculator".into(),
            description: None,
            config_command,
        }
    }

    #[test]
    fn launch_entry_from_json_string() {
        let row = server(Some(json!(
            r#"{"mcpServers": {"calculator": {"command": "npx", "args": ["calc"]}}}"#
        )));
        let (key, block) = row.launch_entry().unwrap();
        assert_eq!(key, "calculator");
        assert_eq!(block, json!({"command": "npx", "args": ["calc"]}));
    }

    #[test]
    fn launch_entry_from_inline_object() {
        let row = server(Some(json!({"mcpServers": {"calc": {"command": "calc"}}})));
        assert_eq!(row.launch_entry().unwrap().0, "calc");
    }

    #[rstest]
    #[case(None)]
    #[case(Some(json!("not json")))]
    #[case(Some(json!({"servers": {}})))]
    #[case(Some(json!({"mcpServers": {}})))]
    #[case(Some(json!({"mcpServers": {"calc": "npx calc"}})))]
    fn unusable_config_command(#[case] config_command: Option<Value>) {
        let err = server(config_command).launch_entry().unwrap_err();
        assert!(matches!(err, Error::InvalidServerConfig { ref registry_name, .. } if registry_name == "calc"));
    }

    #[test]
    fn metadata_from_manifest_fills_defaults() {
        let manifest = PackageManifest::parse(
            r#"{"name": "My Server", "version": "1.0.0", "author": "me"}"#,
        )
        .unwrap();

        let meta = PublishMetadata::from(&manifest);

        assert_eq!(meta.author, "me");
        assert_eq!(meta.runtime, "generic");
        assert_eq!(meta.description, "");
    }
}
